//! workflow::helpers
//!
//! Small building blocks for actions.
//!
//! Functions without a directory argument work on the process working
//! directory, which is the repository root while an action runs.

use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::Context;
use tracing::debug;

use crate::core::config::Config;
use crate::editor::{EditError, EditOutcome, EditSession, TextDocument};
use crate::git::{GitCli, GitError};
use crate::ui::browser::Browser;

/// Copy `from` over `to`.
///
/// With `only_if_exists`, nothing happens when `to` does not exist yet.
/// Returns whether the file was copied.
pub fn copy_file(from: &Path, to: &Path, only_if_exists: bool) -> io::Result<bool> {
    if only_if_exists && !to.exists() {
        debug!("not copying to missing {}", to.display());
        return Ok(false);
    }
    if let Some(parent) = to.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::copy(from, to)?;
    Ok(true)
}

/// Tracked files matching `pattern` (extended regex), relative to the
/// working directory.
pub fn git_grep(pattern: &str) -> Result<BTreeSet<String>, GitError> {
    Ok(GitCli::new(".").grep(pattern)?.into_iter().collect())
}

/// Replace every match of `pattern` in `path`.
///
/// The file is written only if its content changed; returns whether it was.
pub fn replace_in_file(
    path: impl AsRef<Path>,
    pattern: &str,
    replacement: &str,
) -> Result<bool, EditError> {
    let mut session = EditSession::<TextDocument>::open(path)?;
    session.document_mut().replace(pattern, replacement)?;
    Ok(session.commit()? == EditOutcome::Written)
}

/// Opener for the `editor` of the user configuration.
pub fn configured_editor() -> anyhow::Result<Browser> {
    let config = Config::load()?;
    Ok(Browser::from_settings(None, false, config.editor()))
}

/// Let the user edit `files` by hand, one after the other.
///
/// Missing files are created empty first. `wait` is called after the editor
/// was started, and returns once the user is done with the file (see
/// [`press_enter`]). A file left empty is removed.
pub fn edit_files<P, W>(files: &[P], editor: &Browser, mut wait: W) -> anyhow::Result<()>
where
    P: AsRef<Path>,
    W: FnMut(&Path) -> io::Result<()>,
{
    for file in files {
        let file = file.as_ref();
        println!("{}", file.display());
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(file)
            .with_context(|| format!("cannot create {}", file.display()))?;

        editor.open(&file.to_string_lossy())?;
        wait(file)?;

        if fs::metadata(file).is_ok_and(|m| m.len() == 0) {
            debug!("removing empty {}", file.display());
            fs::remove_file(file)?;
        }
    }
    Ok(())
}

/// Wait for the user to press enter.
pub fn press_enter(_: &Path) -> io::Result<()> {
    print!("Press enter to continue");
    io::stdout().flush()?;
    io::stdin().lock().read_line(&mut String::new()).map(drop)
}

/// Files tracked by git in `dir`.
pub fn tracked_files(dir: &Path) -> Result<Vec<String>, GitError> {
    GitCli::new(dir).ls_files()
}

/// File-type tags of every tracked file in `dir`.
///
/// ```no_run
/// use multirepo::workflow::helpers::identify;
///
/// let tags = identify("/src/c2cgeoportal".as_ref())?;
/// if tags.contains("python") {
///     // ...
/// }
/// # Ok::<(), multirepo::git::GitError>(())
/// ```
pub fn identify(dir: &Path) -> Result<BTreeSet<&'static str>, GitError> {
    Ok(tracked_files(dir)?
        .iter()
        .flat_map(|name| tags_from_path(name))
        .collect())
}

/// File-type tags guessed from a file name.
///
/// Every file gets `file`; recognized formats add their language or format
/// tag plus `text`.
pub fn tags_from_path(path: &str) -> BTreeSet<&'static str> {
    let mut tags = BTreeSet::from(["file"]);
    let name = path.rsplit('/').next().unwrap_or(path);

    let by_name: &[&'static str] = match name {
        "Dockerfile" | "Containerfile" => &["dockerfile"],
        "Makefile" | "GNUmakefile" => &["makefile"],
        "Jenkinsfile" => &["groovy"],
        ".gitignore" | ".dockerignore" | ".prettierignore" => &["ignore"],
        ".editorconfig" => &["editorconfig", "ini"],
        "setup.cfg" | "tox.ini" | ".flake8" => &["ini"],
        "Pipfile" => &["toml"],
        _ => &[],
    };

    let extension = name
        .rsplit_once('.')
        .filter(|(stem, _)| !stem.is_empty())
        .map(|(_, ext)| ext.to_ascii_lowercase());
    let by_extension: &[&'static str] = match extension.as_deref() {
        Some("py" | "pyi") => &["python"],
        Some("js" | "mjs" | "cjs") => &["javascript"],
        Some("jsx") => &["javascript", "jsx"],
        Some("ts") => &["ts"],
        Some("tsx") => &["ts", "tsx"],
        Some("json") => &["json"],
        Some("yaml" | "yml") => &["yaml"],
        Some("toml") => &["toml"],
        Some("ini" | "cfg") => &["ini"],
        Some("md" | "markdown") => &["markdown"],
        Some("rst") => &["rst"],
        Some("sh" | "bash") => &["shell"],
        Some("html" | "htm") => &["html"],
        Some("css") => &["css"],
        Some("scss") => &["scss"],
        Some("go") => &["go"],
        Some("rs") => &["rust"],
        Some("java") => &["java"],
        Some("xml") => &["xml"],
        Some("sql") => &["sql"],
        Some("txt") => &["plain-text"],
        Some("mk") => &["makefile"],
        Some("dockerfile") => &["dockerfile"],
        _ => &[],
    };

    if !by_name.is_empty() || !by_extension.is_empty() {
        tags.insert("text");
    }
    tags.extend(by_name);
    tags.extend(by_extension);
    tags
}
