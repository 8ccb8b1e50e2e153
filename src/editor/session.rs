//! editor::session
//!
//! Scoped editing of one file.
//!
//! # Lifecycle
//!
//! An [`EditSession`] reads the file once when opened and parses it into a
//! [`Document`]. The caller mutates the document in memory. The file is
//! touched at most once, when [`EditSession::commit`] runs, and only if the
//! rendered document differs from what was read. Dropping a session without
//! committing discards every in-memory change, which is what happens when a
//! closure passed to [`edit`] returns an error or panics.
//!
//! Writes go to a sibling temporary file that is renamed over the target,
//! so a reader never observes a half-written file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::diff::unified_diff;
use super::precommit::{self, PreCommitConfig};
use super::{Document, EditError};

/// Behavior switches for an edit session.
///
/// # Example
///
/// ```
/// use multirepo::editor::EditOptions;
///
/// let options = EditOptions::default().create_missing(true).diff(true);
/// assert!(options.create_missing && options.diff && !options.force);
/// assert!(!options.run_pre_commit && !options.add_pre_commit_hook);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditOptions {
    /// Start from an empty document when the file does not exist.
    pub create_missing: bool,
    /// Write even when nothing changed.
    pub force: bool,
    /// Produce a unified diff instead of writing.
    pub diff: bool,
    /// Leave a newly created file uncreated if the document is still empty.
    pub remove_if_empty: bool,
    /// After writing, run the hooks of `.pre-commit-config.yaml` on the file
    /// when the current directory has that configuration.
    pub run_pre_commit: bool,
    /// When the file is modified, add the hook formatting its format (see
    /// [`Document::formatter_hook`]) to an existing `.pre-commit-config.yaml`
    /// in the current directory.
    pub add_pre_commit_hook: bool,
}

impl EditOptions {
    pub fn create_missing(mut self, yes: bool) -> Self {
        self.create_missing = yes;
        self
    }

    pub fn force(mut self, yes: bool) -> Self {
        self.force = yes;
        self
    }

    pub fn diff(mut self, yes: bool) -> Self {
        self.diff = yes;
        self
    }

    pub fn remove_if_empty(mut self, yes: bool) -> Self {
        self.remove_if_empty = yes;
        self
    }

    pub fn run_pre_commit(mut self, yes: bool) -> Self {
        self.run_pre_commit = yes;
        self
    }

    pub fn add_pre_commit_hook(mut self, yes: bool) -> Self {
        self.add_pre_commit_hook = yes;
        self
    }
}

/// What happened to the file when the session was committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// Content identical to what was read; the file was not touched.
    Unchanged,
    /// The file was (re)written.
    Written,
    /// Diff mode: the pending change, not written.
    Diff(String),
    /// A file created by this session stayed empty and was not written.
    Skipped,
}

/// One open file under editing.
pub struct EditSession<D: Document> {
    path: PathBuf,
    options: EditOptions,
    existed: bool,
    original: String,
    baseline: String,
    document: D,
    closed: bool,
}

impl<D: Document> std::fmt::Debug for EditSession<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditSession")
            .field("path", &self.path)
            .field("format", &D::FORMAT)
            .field("existed", &self.existed)
            .field("options", &self.options)
            .finish()
    }
}

impl<D: Document> EditSession<D> {
    /// Open an existing file.
    ///
    /// # Errors
    ///
    /// - [`EditError::NotFound`] if the file does not exist
    /// - [`EditError::Encoding`] if it is not UTF-8
    /// - [`EditError::Parse`] if the adapter rejects its content
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EditError> {
        Self::open_with(path, EditOptions::default())
    }

    /// Open a file with explicit options.
    pub fn open_with(path: impl AsRef<Path>, options: EditOptions) -> Result<Self, EditError> {
        let path = path.as_ref().to_path_buf();

        let (existed, original) = match fs::read(&path) {
            Ok(bytes) => {
                let text = String::from_utf8(bytes)
                    .map_err(|_| EditError::Encoding { path: path.clone() })?;
                (true, text)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if !options.create_missing {
                    return Err(EditError::NotFound { path });
                }
                (false, String::new())
            }
            Err(source) => return Err(EditError::Read { path, source }),
        };

        let document = if existed {
            D::parse(&original).map_err(|source| EditError::Parse {
                path: path.clone(),
                source,
            })?
        } else {
            D::empty()
        };
        let baseline = document.render();

        debug!(path = %path.display(), format = D::FORMAT, existed, "opened edit session");

        Ok(Self {
            path,
            options,
            existed,
            original,
            baseline,
            document,
            closed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file existed when the session was opened.
    pub fn existed(&self) -> bool {
        self.existed
    }

    /// The text read at open time (empty for a created file).
    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut D {
        &mut self.document
    }

    /// Whether the rendered document differs from what was read.
    pub fn is_modified(&self) -> bool {
        self.document.render() != self.baseline
    }

    /// Finish the session, writing the file if needed.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::Write`] if the file or its parent directory cannot
    /// be written. The original file is left in place in that case.
    pub fn commit(mut self) -> Result<EditOutcome, EditError> {
        self.closed = true;
        let rendered = self.document.render();

        if !self.existed && self.options.remove_if_empty && self.document.is_empty() {
            debug!(path = %self.path.display(), "new document is empty, not creating it");
            return Ok(EditOutcome::Skipped);
        }

        if rendered == self.baseline && !self.options.force {
            debug!(path = %self.path.display(), "no change");
            return Ok(EditOutcome::Unchanged);
        }

        if self.options.diff {
            let diff = unified_diff(&self.path.display().to_string(), &self.original, &rendered);
            info!(path = %self.path.display(), "pending change:\n{diff}");
            return Ok(EditOutcome::Diff(diff));
        }

        if self.options.add_pre_commit_hook {
            self.add_formatter_hook();
        }
        write_atomic(&self.path, &rendered)?;
        info!(path = %self.path.display(), "updated");
        if self.options.run_pre_commit {
            precommit::run_hooks(&self.path);
        }
        Ok(EditOutcome::Written)
    }

    /// Add the format's hook to the pre-commit configuration. Failures are
    /// logged: the file itself is still written.
    fn add_formatter_hook(&self) {
        let Some(formatter) = D::formatter_hook() else {
            return;
        };
        let config = Path::new(PreCommitConfig::FILENAME);
        if !config.is_file() || is_same_file(config, &self.path) {
            return;
        }
        match edit(config, |config: &mut PreCommitConfig| config.add_formatter(formatter)) {
            Ok(true) => info!("added the {} pre-commit hook", formatter.id),
            Ok(false) => {}
            Err(e) => warn!("could not add the {} pre-commit hook: {e}", formatter.id),
        }
    }

    /// Drop every in-memory change.
    pub fn discard(mut self) {
        self.closed = true;
        debug!(path = %self.path.display(), "edit session discarded");
    }
}

impl<D: Document> std::ops::Deref for EditSession<D> {
    type Target = D;

    fn deref(&self) -> &D {
        &self.document
    }
}

impl<D: Document> std::ops::DerefMut for EditSession<D> {
    fn deref_mut(&mut self) -> &mut D {
        &mut self.document
    }
}

impl<D: Document> Drop for EditSession<D> {
    fn drop(&mut self) {
        if !self.closed {
            debug!(
                path = %self.path.display(),
                "edit session closed without commit, changes discarded"
            );
        }
    }
}

/// Edit an existing file within a closure.
///
/// The file is written only if the closure succeeds and changed something.
/// On error the file is untouched and the closure's error is returned as is.
///
/// # Example
///
/// ```no_run
/// use multirepo::editor::{edit, StructuredDocument, YamlDocument};
///
/// edit(".pre-commit-config.yaml", |doc: &mut YamlDocument| {
///     doc.set("ci.autoupdate_schedule", "quarterly")?;
///     Ok::<_, multirepo::editor::EditError>(())
/// })?;
/// # Ok::<(), multirepo::editor::EditError>(())
/// ```
pub fn edit<D, T, E, F>(path: impl AsRef<Path>, f: F) -> Result<T, E>
where
    D: Document,
    F: FnOnce(&mut D) -> Result<T, E>,
    E: From<EditError>,
{
    edit_with(path, EditOptions::default(), f)
}

/// [`edit`] with explicit options.
pub fn edit_with<D, T, E, F>(path: impl AsRef<Path>, options: EditOptions, f: F) -> Result<T, E>
where
    D: Document,
    F: FnOnce(&mut D) -> Result<T, E>,
    E: From<EditError>,
{
    let mut session = EditSession::<D>::open_with(path, options)?;
    let value = f(session.document_mut())?;
    session.commit()?;
    Ok(value)
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Replace `path` with `contents` through a temporary sibling file.
///
/// Creates missing parent directories and keeps the permissions of the file
/// being replaced.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<(), EditError> {
    let write_err = |source| EditError::Write {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(write_err)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = parent.join(format!(".{file_name}.mra-tmp"));

    let result = (|| {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;
        if let Ok(metadata) = fs::metadata(path) {
            fs::set_permissions(&temp_path, metadata.permissions())?;
        }
        fs::rename(&temp_path, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result.map_err(write_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::{StructuredDocument, TextDocument, YamlDocument};
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn backdate(path: &Path) -> SystemTime {
        let old = SystemTime::now() - Duration::from_secs(3600);
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(old).unwrap();
        fs::metadata(path).unwrap().modified().unwrap()
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = EditSession::<YamlDocument>::open(dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, EditError::NotFound { .. }));
    }

    #[test]
    fn read_only_session_does_not_touch_mtime() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.yaml", "# comment\na: 1\n");
        let before = backdate(&path);

        let value = edit(&path, |doc: &mut YamlDocument| {
            Ok::<_, EditError>(doc.get("a"))
        })
        .unwrap();

        assert_eq!(value, Some(1.into()));
        assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), before);
    }

    #[test]
    fn error_in_closure_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let original = "a: 1  # keep\nb: [1, 2]\n";
        let path = write(&dir, "a.yaml", original);

        let result: Result<(), anyhow::Error> = edit(&path, |doc: &mut YamlDocument| {
            doc.set("a", 2)?;
            anyhow::bail!("callback failed after mutating")
        });

        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn mutation_is_written_once_at_commit() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.yaml", "a: 1  # keep\n");

        let mut session = EditSession::<YamlDocument>::open(&path).unwrap();
        session.set("a", 2).unwrap();
        assert!(session.is_modified());
        assert_eq!(fs::read_to_string(&path).unwrap(), "a: 1  # keep\n");

        assert_eq!(session.commit().unwrap(), EditOutcome::Written);
        assert_eq!(fs::read_to_string(&path).unwrap(), "a: 2  # keep\n");
    }

    #[test]
    fn dropped_session_discards() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "notes.txt", "hello\n");
        {
            let mut session = EditSession::<TextDocument>::open(&path).unwrap();
            session.content.push_str("world\n");
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello\n");
    }

    #[test]
    fn create_missing_writes_when_mutated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sub/dir/new.yaml");

        edit_with(
            &path,
            EditOptions::default().create_missing(true),
            |doc: &mut YamlDocument| doc.set("key", "value"),
        )
        .unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "key: value\n");
    }

    #[test]
    fn remove_if_empty_skips_creation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("never.yaml");

        let session = EditSession::<YamlDocument>::open_with(
            &path,
            EditOptions::default().create_missing(true).remove_if_empty(true).force(true),
        )
        .unwrap();
        assert_eq!(session.commit().unwrap(), EditOutcome::Skipped);
        assert!(!path.exists());
    }

    #[test]
    fn diff_mode_does_not_write() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.yaml", "a: 1\n");

        let mut session =
            EditSession::<YamlDocument>::open_with(&path, EditOptions::default().diff(true))
                .unwrap();
        session.set("a", 2).unwrap();
        let outcome = session.commit().unwrap();

        match outcome {
            EditOutcome::Diff(diff) => {
                assert!(diff.contains("-a: 1"));
                assert!(diff.contains("+a: 2"));
            }
            other => panic!("expected a diff, got {other:?}"),
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "a: 1\n");
    }

    #[test]
    fn force_rewrites_unchanged_file() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.txt", "same\n");
        let session =
            EditSession::<TextDocument>::open_with(&path, EditOptions::default().force(true))
                .unwrap();
        assert_eq!(session.commit().unwrap(), EditOutcome::Written);
        assert_eq!(fs::read_to_string(&path).unwrap(), "same\n");
    }

    #[cfg(unix)]
    #[test]
    fn permissions_are_preserved() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = write(&dir, "run.sh", "echo hi\n");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();

        edit(&path, |doc: &mut TextDocument| {
            doc.content.push_str("echo bye\n");
            Ok::<_, EditError>(())
        })
        .unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bin.txt");
        fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        let err = EditSession::<TextDocument>::open(&path).unwrap_err();
        assert!(matches!(err, EditError::Encoding { .. }));
    }

    #[test]
    fn parse_error_names_the_file() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "bad.toml", "a = = 1\n");
        let err = EditSession::<crate::editor::TomlDocument>::open(&path).unwrap_err();
        assert!(matches!(err, EditError::Parse { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }

    mod pre_commit {
        use super::*;
        use crate::editor::{PreCommitConfig, TomlDocument};
        use crate::workflow::WorkingDir;

        const CONFIG: &str = "\
repos:
  - repo: https://github.com/pre-commit/pre-commit-hooks
    rev: v4.5.0
    hooks:
      - id: check-yaml
";

        fn options() -> EditOptions {
            EditOptions::default().add_pre_commit_hook(true)
        }

        fn config() -> PreCommitConfig {
            PreCommitConfig::parse(&fs::read_to_string(PreCommitConfig::FILENAME).unwrap()).unwrap()
        }

        const PRETTIER: &str = "https://github.com/pre-commit/mirrors-prettier";

        #[test]
        fn modified_yaml_adds_prettier() {
            let dir = TempDir::new().unwrap();
            write(&dir, PreCommitConfig::FILENAME, CONFIG);
            write(&dir, "ci.yaml", "a: 1\n");
            let _cwd = WorkingDir::enter(dir.path()).unwrap();

            edit_with("ci.yaml", options(), |doc: &mut YamlDocument| doc.set("a", 2)).unwrap();

            let config = config();
            assert!(config.has_hook(PRETTIER, "prettier"));
            assert_eq!(
                config.commented_additional_dependencies(PRETTIER, "prettier"),
                vec![("prettier@2.8.4".to_string(), Some("npm".to_string()))]
            );
            assert_eq!(fs::read_to_string("ci.yaml").unwrap(), "a: 2\n");
        }

        #[test]
        fn modified_toml_adds_the_plugin() {
            let dir = TempDir::new().unwrap();
            write(&dir, PreCommitConfig::FILENAME, CONFIG);
            write(&dir, "pyproject.toml", "[tool.black]\n");
            let _cwd = WorkingDir::enter(dir.path()).unwrap();

            edit_with("pyproject.toml", options(), |doc: &mut TomlDocument| {
                doc.set("tool.black.line-length", 110)
            })
            .unwrap();

            assert_eq!(
                config().get("repos.1.hooks.0.additional_dependencies.1"),
                Some("prettier-plugin-toml@0.3.1".into())
            );
        }

        #[test]
        fn only_on_change_and_only_with_a_config() {
            let dir = TempDir::new().unwrap();
            write(&dir, PreCommitConfig::FILENAME, CONFIG);
            write(&dir, "ci.yaml", "a: 1\n");
            let _cwd = WorkingDir::enter(dir.path()).unwrap();

            edit_with("ci.yaml", options(), |doc: &mut YamlDocument| doc.set("a", 1)).unwrap();
            edit_with("ci.yaml", options().diff(true), |doc: &mut YamlDocument| doc.set("a", 3))
                .unwrap();
            edit_with("notes.txt", options().create_missing(true), |doc: &mut TextDocument| {
                doc.content.push_str("text has no formatter\n");
                Ok::<_, EditError>(())
            })
            .unwrap();
            assert_eq!(fs::read_to_string(PreCommitConfig::FILENAME).unwrap(), CONFIG);

            fs::remove_file(PreCommitConfig::FILENAME).unwrap();
            edit_with("ci.yaml", options(), |doc: &mut YamlDocument| doc.set("a", 4)).unwrap();
            assert!(!Path::new(PreCommitConfig::FILENAME).exists());
        }

        #[test]
        fn editing_the_config_itself() {
            let dir = TempDir::new().unwrap();
            write(&dir, PreCommitConfig::FILENAME, CONFIG);
            let _cwd = WorkingDir::enter(dir.path()).unwrap();

            edit_with(PreCommitConfig::FILENAME, options(), |doc: &mut YamlDocument| {
                doc.set("ci.skip", vec!["pylint"])
            })
            .unwrap();

            let config = config();
            assert!(!config.has_hook(PRETTIER, "prettier"));
            assert_eq!(config.get("ci.skip.0"), Some("pylint".into()));
        }

        #[test]
        fn failing_hooks_do_not_fail_the_write() {
            let dir = TempDir::new().unwrap();
            write(&dir, PreCommitConfig::FILENAME, CONFIG);
            write(&dir, "ci.yaml", "a: 1\n");
            let _cwd = WorkingDir::enter(dir.path()).unwrap();

            // Not a git checkout: pre-commit, when installed, fails here.
            let session = EditSession::<YamlDocument>::open_with(
                "ci.yaml",
                EditOptions::default().run_pre_commit(true),
            );
            let mut session = session.unwrap();
            session.set("a", 2).unwrap();
            assert_eq!(session.commit().unwrap(), EditOutcome::Written);
            assert_eq!(fs::read_to_string("ci.yaml").unwrap(), "a: 2\n");
        }
    }
}
