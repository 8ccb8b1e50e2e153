//! editor::precommit
//!
//! Helpers for `.pre-commit-config.yaml`, and for running its hooks on a
//! file that was just written.

use std::env;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tracing::{debug, warn};

use super::{Document, EditError, KeyPath, Mapping, ParseError, StructuredDocument, Value, YamlDocument};

/// Regexes longer than this are rewritten in verbose form by [`PreCommitConfig::fix_files`].
const LONG_REGEX: usize = 60;

const PRETTIER: &str = "https://github.com/pre-commit/mirrors-prettier";

/// A hook that formats the files of one format.
///
/// Sessions opened with [`EditOptions::add_pre_commit_hook`] add it to the
/// repository's pre-commit configuration when they modify such a file.
///
/// [`EditOptions::add_pre_commit_hook`]: super::EditOptions::add_pre_commit_hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatterHook {
    pub repo: &'static str,
    pub rev: &'static str,
    pub id: &'static str,
    pub dependencies: &'static [&'static str],
    /// Package type noted after each dependency (`- dep # npm`), read by
    /// Renovate.
    pub dependency_type: Option<&'static str>,
}

/// Prettier, for YAML files.
pub const PRETTIER_YAML: FormatterHook = FormatterHook {
    repo: PRETTIER,
    rev: "v2.7.1",
    id: "prettier",
    dependencies: &["prettier@2.8.4"],
    dependency_type: Some("npm"),
};

/// Prettier with its TOML plugin.
pub const PRETTIER_TOML: FormatterHook = FormatterHook {
    repo: PRETTIER,
    rev: "v2.7.1",
    id: "prettier",
    dependencies: &["prettier@2.8.4", "prettier-plugin-toml@0.3.1"],
    dependency_type: None,
};

/// A pre-commit configuration, edited through its YAML document.
///
/// ```no_run
/// use multirepo::editor::{edit, EditError, Mapping, PreCommitConfig};
///
/// edit(PreCommitConfig::FILENAME, |config: &mut PreCommitConfig| {
///     let black = "https://github.com/psf/black";
///     config.add_repo(black, "24.1.0")?;
///     config.add_hook(black, [("id", "black")].into_iter().collect::<Mapping>(), false)?;
///     Ok::<_, EditError>(())
/// })?;
/// # Ok::<(), EditError>(())
/// ```
#[derive(Debug, Clone)]
pub struct PreCommitConfig {
    doc: YamlDocument,
}

impl PreCommitConfig {
    pub const FILENAME: &'static str = ".pre-commit-config.yaml";

    pub fn new(doc: YamlDocument) -> Self {
        Self { doc }
    }

    pub fn into_inner(self) -> YamlDocument {
        self.doc
    }

    fn repo_index(&self, repo: &str) -> Option<usize> {
        self.repos()
            .iter()
            .position(|entry| entry.get("repo").and_then(Value::as_str) == Some(repo))
    }

    /// The `repos` entries that are mappings.
    pub fn repos(&self) -> Vec<Mapping> {
        match self.doc.get("repos") {
            Some(Value::Sequence(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::Mapping(map) => map,
                    _ => Mapping::new(),
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn has_repo(&self, repo: &str) -> bool {
        self.repo_index(repo).is_some()
    }

    /// Add a repository with an empty hook list. Returns `false` if it is
    /// already configured; its `rev` is left alone in that case.
    pub fn add_repo(&mut self, repo: &str, rev: &str) -> Result<bool, EditError> {
        if self.has_repo(repo) {
            return Ok(false);
        }
        let entry: Mapping = [
            ("repo", Value::from(repo)),
            ("rev", Value::from(rev)),
            ("hooks", Value::Sequence(Vec::new())),
        ]
        .into_iter()
        .collect();
        self.doc.push("repos", entry)?;
        Ok(true)
    }

    /// Indexes of the repository and of the hook in its `hooks` list.
    fn hook_index(&self, repo: &str, hook_id: &str) -> Option<(usize, usize)> {
        let repo_index = self.repo_index(repo)?;
        let hook_index = self.repos()[repo_index]
            .get("hooks")
            .and_then(Value::as_sequence)?
            .iter()
            .position(|hook| {
                hook.as_mapping()
                    .and_then(|hook| hook.get("id"))
                    .and_then(Value::as_str)
                    == Some(hook_id)
            })?;
        Some((repo_index, hook_index))
    }

    pub fn has_hook(&self, repo: &str, hook_id: &str) -> bool {
        self.hook_index(repo, hook_id).is_some()
    }

    /// Add a hook to a configured repository, optionally listing it in
    /// `ci.skip`. Returns `false` if a hook with the same id is already there.
    pub fn add_hook(&mut self, repo: &str, hook: Mapping, ci_skip: bool) -> Result<bool, EditError> {
        let id = hook
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| EditError::InvalidPath(format!("hook for '{repo}' has no 'id'")))?
            .to_string();
        let index = self
            .repo_index(repo)
            .ok_or_else(|| EditError::InvalidPath(format!("repos[repo={repo}]")))?;
        if self.has_hook(repo, &id) {
            return Ok(false);
        }
        self.doc.push(&KeyPath::parse(&format!("repos.{index}.hooks"))?, hook)?;
        if ci_skip {
            self.skip_ci(&id)?;
        }
        Ok(true)
    }

    /// The `additional_dependencies` of a hook with their end-of-line
    /// comments.
    pub fn commented_additional_dependencies(
        &self,
        repo: &str,
        hook_id: &str,
    ) -> Vec<(String, Option<String>)> {
        let Some((repo_index, hook_index)) = self.hook_index(repo, hook_id) else {
            return Vec::new();
        };
        let path = dependencies_path(repo_index, hook_index);
        let Some(Value::Sequence(items)) = self.doc.get(path.as_str()) else {
            return Vec::new();
        };
        items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| {
                let name = item.as_str()?.to_string();
                Some((name, self.doc.comment(format!("{path}.{index}").as_str())))
            })
            .collect()
    }

    /// Append dependencies to a hook's `additional_dependencies`, then note
    /// `dependency_type` after every entry of the list:
    ///
    /// ```yaml
    /// additional_dependencies:
    ///   - poetry==1.4.1 # pypi
    /// ```
    ///
    /// Dependencies already listed are not repeated. A flow list is
    /// rewritten in block style, since only block items take comments.
    ///
    /// # Errors
    ///
    /// [`EditError::InvalidPath`] if the repository or the hook is not
    /// configured.
    pub fn add_commented_additional_dependencies<S: AsRef<str>>(
        &mut self,
        repo: &str,
        hook_id: &str,
        dependencies: &[S],
        dependency_type: &str,
    ) -> Result<(), EditError> {
        let (repo_index, hook_index) = self.hook_index(repo, hook_id).ok_or_else(|| {
            EditError::InvalidPath(format!("repos[repo={repo}].hooks[id={hook_id}]"))
        })?;
        let path = KeyPath::parse(&dependencies_path(repo_index, hook_index))?;

        let mut items = match self.doc.get_at(&path) {
            Some(Value::Sequence(items)) => items,
            None | Some(Value::Null) => Vec::new(),
            Some(other) => {
                return Err(EditError::NotAContainer {
                    path: path.to_string(),
                    found: other.kind(),
                })
            }
        };
        let added: Vec<Value> = dependencies
            .iter()
            .map(|dependency| Value::from(dependency.as_ref()))
            .filter(|dependency| !items.contains(dependency))
            .collect();

        self.doc.restoring(|doc| {
            if doc.is_block_sequence(&path) {
                for dependency in added {
                    doc.push_at(&path, dependency)?;
                }
            } else {
                items.extend(added);
                doc.remove_at(&path)?;
                doc.set_at(&path, Value::Sequence(items))?;
            }
            let len = match doc.get_at(&path) {
                Some(Value::Sequence(items)) => items.len(),
                _ => 0,
            };
            for index in 0..len {
                doc.set_comment(path.child(index.to_string()), dependency_type)?;
            }
            Ok(())
        })
    }

    /// Add a formatter's repository and hook. Returns `false` if the hook
    /// was already configured.
    pub fn add_formatter(&mut self, formatter: &FormatterHook) -> Result<bool, EditError> {
        if self.has_hook(formatter.repo, formatter.id) {
            return Ok(false);
        }
        self.add_repo(formatter.repo, formatter.rev)?;
        let mut hook: Mapping = [("id", formatter.id)].into_iter().collect();
        match formatter.dependency_type {
            Some(dependency_type) => {
                self.add_hook(formatter.repo, hook, false)?;
                self.add_commented_additional_dependencies(
                    formatter.repo,
                    formatter.id,
                    formatter.dependencies,
                    dependency_type,
                )?;
            }
            None => {
                hook.insert(
                    "additional_dependencies",
                    Value::from(formatter.dependencies.to_vec()),
                );
                self.add_hook(formatter.repo, hook, false)?;
            }
        }
        Ok(true)
    }

    /// List a hook in `ci.skip` so pre-commit.ci does not run it.
    pub fn skip_ci(&mut self, hook_id: &str) -> Result<bool, EditError> {
        let listed = self
            .doc
            .get("ci.skip")
            .as_ref()
            .and_then(Value::as_sequence)
            .is_some_and(|skip| skip.iter().any(|id| id.as_str() == Some(hook_id)));
        if listed {
            return Ok(false);
        }
        self.doc.push("ci.skip", hook_id)?;
        Ok(true)
    }

    /// A regex matching exactly the given files.
    ///
    /// One file gives `^file$`; several give a verbose `(?x)` alternation
    /// with one file per line, written as a literal block.
    pub fn create_files_regex<S: AsRef<str>>(files: &[S], add_start_end: bool) -> String {
        let (start, end) = if add_start_end { ("^", "$") } else { ("", "") };
        match files {
            [file] => format!("{start}{}{end}", file.as_ref()),
            _ => {
                let joined: Vec<&str> = files.iter().map(AsRef::as_ref).collect();
                format!("(?x){start}(\n  {}\n){end}", joined.join("\n  |"))
            }
        }
    }

    /// Rewrite long one-line `files`/`exclude` alternations in verbose form.
    /// Returns the number of rewritten regexes.
    pub fn fix_files(&mut self) -> Result<usize, EditError> {
        let mut fixed = 0;
        for (repo_index, repo) in self.repos().iter().enumerate() {
            let Some(hooks) = repo.get("hooks").and_then(Value::as_sequence) else {
                continue;
            };
            for (hook_index, hook) in hooks.iter().enumerate() {
                for attribute in ["files", "exclude"] {
                    let Some(regex) = hook
                        .as_mapping()
                        .and_then(|hook| hook.get(attribute))
                        .and_then(Value::as_str)
                    else {
                        continue;
                    };
                    if regex.len() <= LONG_REGEX {
                        continue;
                    }
                    let Some(rewritten) = verbose_regex(regex).filter(|new| new != regex) else {
                        continue;
                    };
                    let path = format!("repos.{repo_index}.hooks.{hook_index}.{attribute}");
                    self.doc.set(&KeyPath::parse(&path)?, rewritten)?;
                    fixed += 1;
                }
            }
        }
        Ok(fixed)
    }
}

fn dependencies_path(repo_index: usize, hook_index: usize) -> String {
    format!("repos.{repo_index}.hooks.{hook_index}.additional_dependencies")
}

/// Run the hooks of the current directory's pre-commit configuration on
/// one file.
///
/// Does nothing without a configuration. Hooks that fail, or that fixed
/// the file (which pre-commit also reports as a failure), are only logged.
pub fn run_hooks(file: &Path) {
    if Path::new(PreCommitConfig::FILENAME).is_file() {
        run_hooks_with("pre-commit", file);
    }
}

fn run_hooks_with(program: &str, file: &Path) -> Option<Output> {
    let file = relative_to_cwd(file);
    debug!("$ {program} run --color=never --files {}", file.display());
    match Command::new(program)
        .args(["run", "--color=never", "--files"])
        .arg(&file)
        .output()
    {
        Ok(output) => {
            if !output.status.success() {
                debug!(
                    "pre-commit on {} exited with {}:\n{}",
                    file.display(),
                    output.status,
                    String::from_utf8_lossy(&output.stdout).trim_end()
                );
            }
            Some(output)
        }
        Err(e) => {
            warn!("could not run {program} on {}: {e}", file.display());
            None
        }
    }
}

/// pre-commit matches hook `files` patterns against repository-relative
/// paths.
fn relative_to_cwd(file: &Path) -> PathBuf {
    env::current_dir()
        .ok()
        .and_then(|cwd| file.strip_prefix(cwd).ok().map(Path::to_path_buf))
        .unwrap_or_else(|| file.to_path_buf())
}

/// `(a|b)` or `^(a|b)$`, optionally already in `(?x)` form, as a verbose regex.
fn verbose_regex(regex: &str) -> Option<String> {
    let mut text = regex.trim();
    if let Some(rest) = text.strip_prefix("(?x)") {
        text = rest.trim();
    }
    let (inner, anchored) = if let Some(inner) = text.strip_prefix("^(").and_then(|t| t.strip_suffix(")$")) {
        (inner, true)
    } else if let Some(inner) = text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        (inner, false)
    } else {
        return None;
    };
    let files: Vec<&str> = inner.split('|').map(str::trim).collect();
    Some(PreCommitConfig::create_files_regex(&files, anchored))
}

impl Deref for PreCommitConfig {
    type Target = YamlDocument;

    fn deref(&self) -> &Self::Target {
        &self.doc
    }
}

impl DerefMut for PreCommitConfig {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.doc
    }
}

impl Document for PreCommitConfig {
    const FORMAT: &'static str = YamlDocument::FORMAT;

    fn parse(text: &str) -> Result<Self, ParseError> {
        YamlDocument::parse(text).map(Self::new)
    }

    fn empty() -> Self {
        Self::new(YamlDocument::empty())
    }

    fn render(&self) -> String {
        self.doc.render()
    }

    fn is_empty(&self) -> bool {
        self.doc.is_empty()
    }
}
