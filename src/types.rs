// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Canonical target name type used throughout the daemon.
///
/// Names are root-relative, slash-separated paths such as `"lib/strings"`.
/// Only the definition loader and the watch registry look inside them; the
/// graph and the scheduler treat them as opaque keys.
pub type TargetName = String;

/// Build mode of a target: selects the backend in the scheduler's dispatch
/// table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
pub enum BuildMode {
    #[serde(rename = "cpp/library")]
    CppLibrary,
    #[serde(rename = "cpp/binary")]
    CppBinary,
    #[serde(rename = "command")]
    Command,
}

impl BuildMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildMode::CppLibrary => "cpp/library",
            BuildMode::CppBinary => "cpp/binary",
            BuildMode::Command => "command",
        }
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cpp/library" => Ok(BuildMode::CppLibrary),
            "cpp/binary" => Ok(BuildMode::CppBinary),
            "command" => Ok(BuildMode::Command),
            other => Err(format!(
                "invalid build mode: {other} (expected \"cpp/library\", \"cpp/binary\" or \"command\")"
            )),
        }
    }
}

/// Split a target name into `(directory, local_name)`.
///
/// `"a/b/c"` lives in directory `"a/b"` under the local name `"c"`; a
/// root-level target `"c"` lives in the empty directory `""`.
pub fn split_target_name(name: &str) -> (&str, &str) {
    match name.rfind('/') {
        Some(idx) => (&name[..idx], &name[idx + 1..]),
        None => ("", name),
    }
}

/// Every directory whose definition file can contribute to `name`, outermost
/// first: `"a/b/c"` yields `["", "a", "a/b"]`.
pub fn definition_dirs(name: &str) -> Vec<String> {
    let (dir, _) = split_target_name(name);
    let mut dirs = vec![String::new()];
    if dir.is_empty() {
        return dirs;
    }

    let mut prefix = String::new();
    for element in dir.split('/') {
        if !prefix.is_empty() {
            prefix.push('/');
        }
        prefix.push_str(element);
        dirs.push(prefix.clone());
    }
    dirs
}

/// Join a root-relative directory and a relative pattern with `/`.
pub fn join_rel(dir: &str, rel: &str) -> String {
    if dir.is_empty() {
        rel.to_string()
    } else {
        format!("{dir}/{rel}")
    }
}
