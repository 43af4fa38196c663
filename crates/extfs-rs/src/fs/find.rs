use regex::Regex;

use super::FileSystem;
use crate::error::{FsError, FsResult};

/// `wildcard_regex` compiles a `*`/`?` pattern into a case-insensitive anchored regex.
fn wildcard_regex(pattern: &str) -> FsResult<Regex> {
    let body = regex::escape(pattern)
        .replace(r"\*", ".*")
        .replace(r"\?", ".");
    Regex::new(&format!("(?i)^{body}$")).map_err(|err| FsError::InvalidPattern {
        pattern: pattern.to_owned(),
        reason: err.to_string(),
    })
}

impl FileSystem {
    /// `find` walks the directory at `path` and returns the full path of every entry whose
    /// name matches `pattern` (`*` any run, `?` one character, case-insensitive).
    ///
    /// # Errors
    /// Fails if `path` is not a directory or the pattern does not compile.
    pub fn find(&self, path: &str, pattern: &str) -> FsResult<Vec<String>> {
        let matcher = wildcard_regex(pattern)?;
        let start = self.lookup(path)?;
        if !self.load_inode(start)?.is_dir() {
            return Err(FsError::NotADirectory(path.to_owned()));
        }
        let base = path.trim_end_matches('/');
        let mut hits = Vec::new();
        self.find_in(start, base, &matcher, &mut hits)?;
        Ok(hits)
    }

    fn find_in(&self, dir: u32, base: &str, matcher: &Regex, hits: &mut Vec<String>) -> FsResult<()> {
        let inode = self.load_inode(dir)?;
        for (name, child) in self.dir_children(&inode)? {
            let full = format!("{base}/{name}");
            if matcher.is_match(&name) {
                hits.push(full.clone());
            }
            if self.load_inode(child)?.is_dir() {
                self.find_in(child, &full, matcher, hits)?;
            }
        }
        Ok(())
    }
}
