//! editor::renovate
//!
//! Helpers for `.github/renovate.json5`: custom regex managers and package
//! rules, each optionally labelled by the comment written above it.

use std::ops::{Deref, DerefMut};

use super::{Document, EditError, Json5Document, KeyPath, Mapping, ParseError, StructuredDocument, Value};

const MANAGERS: &str = "customManagers";
const PACKAGE_RULES: &str = "packageRules";

/// A Renovate configuration, edited through its JSON5 document.
///
/// ```no_run
/// use multirepo::editor::{edit, EditError, Mapping, RenovateConfig, Value};
///
/// edit(RenovateConfig::FILENAME, |config: &mut RenovateConfig| {
///     let rule: Mapping = [("matchPackageNames", Value::from(vec!["black"])), ("groupName", "black".into())]
///         .into_iter()
///         .collect();
///     config.add_package_rule(rule, Some("Group black"), None)?;
///     Ok::<_, EditError>(())
/// })?;
/// # Ok::<(), EditError>(())
/// ```
#[derive(Debug, Clone)]
pub struct RenovateConfig {
    doc: Json5Document,
}

impl RenovateConfig {
    pub const FILENAME: &'static str = ".github/renovate.json5";

    pub fn new(doc: Json5Document) -> Self {
        Self { doc }
    }

    pub fn into_inner(self) -> Json5Document {
        self.doc
    }

    /// Entries of the list `name` with the comment above each.
    fn entries(&self, name: &str) -> Vec<(Mapping, Option<String>)> {
        match self.doc.get(name) {
            Some(Value::Sequence(items)) => items
                .into_iter()
                .enumerate()
                .map(|(index, item)| {
                    let map = match item {
                        Value::Mapping(map) => map,
                        _ => Mapping::new(),
                    };
                    (map, self.doc.comment(format!("{name}.{index}").as_str()))
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Index of the regex manager labelled `comment`, or else of the first
    /// one holding every entry of `data`.
    pub fn regex_manager_index(&self, data: &Mapping, comment: Option<&str>) -> Option<usize> {
        self.entries(MANAGERS).iter().position(|(manager, label)| {
            (comment.is_some() && label.as_deref() == comment)
                || (!data.is_empty() && data.iter().all(|(key, value)| manager.get(key) == Some(value)))
        })
    }

    /// Add a regex manager, or replace the one [`Self::regex_manager_index`]
    /// finds.
    pub fn add_regex_manager(&mut self, data: Mapping, comment: Option<&str>) -> Result<(), EditError> {
        let index = self.regex_manager_index(&data, comment);
        self.put(MANAGERS, index, data, comment)
    }

    /// Returns whether a manager was found and removed.
    pub fn remove_regex_manager(&mut self, data: &Mapping, comment: Option<&str>) -> Result<bool, EditError> {
        let index = self.regex_manager_index(data, comment);
        self.take(MANAGERS, index)
    }

    /// Index of the package rule matching `data`.
    ///
    /// Tried in order: the rule labelled `comment`, the first rule agreeing
    /// with `data` on every one of `check_keys`, and a rule with exactly the
    /// entries of `data`.
    pub fn package_rule_index(
        &self,
        data: &Mapping,
        comment: Option<&str>,
        check_keys: Option<&[&str]>,
    ) -> Option<usize> {
        let rules = self.entries(PACKAGE_RULES);
        let labelled = || {
            let comment = comment?;
            rules.iter().position(|(_, label)| label.as_deref() == Some(comment))
        };
        let checked = || {
            let keys = check_keys?;
            rules.iter().position(|(rule, _)| {
                keys.iter()
                    .all(|key| rule.get(key).is_some() && rule.get(key) == data.get(key))
            })
        };
        let same = || rules.iter().position(|(rule, _)| same_entries(rule, data));
        labelled().or_else(checked).or_else(same)
    }

    /// Add a package rule, or replace the one [`Self::package_rule_index`]
    /// finds.
    pub fn add_package_rule(
        &mut self,
        data: Mapping,
        comment: Option<&str>,
        check_keys: Option<&[&str]>,
    ) -> Result<(), EditError> {
        let index = self.package_rule_index(&data, comment, check_keys);
        self.put(PACKAGE_RULES, index, data, comment)
    }

    /// Returns whether a rule was found and removed.
    pub fn remove_package_rule(
        &mut self,
        data: &Mapping,
        comment: Option<&str>,
        check_keys: Option<&[&str]>,
    ) -> Result<bool, EditError> {
        let index = self.package_rule_index(data, comment, check_keys);
        self.take(PACKAGE_RULES, index)
    }

    fn put(&mut self, list: &str, index: Option<usize>, data: Mapping, comment: Option<&str>) -> Result<(), EditError> {
        self.doc.restoring(|doc| match (index, comment) {
            (Some(index), comment) => {
                let path = KeyPath::from_segments([list.to_string(), index.to_string()])?;
                doc.set_at(&path, Value::Mapping(data))?;
                match comment {
                    Some(comment) => doc.set_comment(&path, comment),
                    None => Ok(()),
                }
            }
            (None, Some(comment)) => doc.push_with_comment(list, data, comment),
            (None, None) => doc.push(list, data),
        })
    }

    fn take(&mut self, list: &str, index: Option<usize>) -> Result<bool, EditError> {
        match index {
            Some(index) => Ok(self.doc.remove(format!("{list}.{index}").as_str())?.is_some()),
            None => Ok(false),
        }
    }
}

/// Same keys with equal values, in any order.
fn same_entries(a: &Mapping, b: &Mapping) -> bool {
    a.len() == b.len() && a.iter().all(|(key, value)| b.get(key) == Some(value))
}

impl Deref for RenovateConfig {
    type Target = Json5Document;

    fn deref(&self) -> &Self::Target {
        &self.doc
    }
}

impl DerefMut for RenovateConfig {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.doc
    }
}

impl Document for RenovateConfig {
    const FORMAT: &'static str = Json5Document::FORMAT;

    fn parse(text: &str) -> Result<Self, ParseError> {
        Json5Document::parse(text).map(Self::new)
    }

    fn empty() -> Self {
        Self::new(Json5Document::empty())
    }

    fn render(&self) -> String {
        self.doc.render()
    }

    fn is_empty(&self) -> bool {
        self.doc.is_empty()
    }
}
