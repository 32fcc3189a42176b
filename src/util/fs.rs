use anyhow::{anyhow, Context, Result};
use nix::unistd::{chown, Group, User};
use std::fs;
use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

pub fn ensure_dir(path: &Path, mode: u32) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("create directory {}", path.display()))?;
    }
    set_permissions(path, mode)
}

pub fn set_permissions(path: &Path, mode: u32) -> Result<()> {
    #[cfg(unix)]
    {
        let perm = fs::Permissions::from_mode(mode);
        fs::set_permissions(path, perm)
            .with_context(|| format!("set permissions {:o} on {}", mode, path.display()))?;
    }
    Ok(())
}

/// Owner and group applied to files the tool writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ownership {
    pub user: Option<String>,
    pub group: Option<String>,
}

impl Ownership {
    pub fn new(user: Option<String>, group: Option<String>) -> Self {
        Self {
            user: user.filter(|u| !u.is_empty()),
            group: group.filter(|g| !g.is_empty()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.user.is_none() && self.group.is_none()
    }

    /// chown `path`; a no-op when neither user nor group is set.
    pub fn apply(&self, path: &Path) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        let uid = match &self.user {
            Some(name) => Some(
                User::from_name(name)
                    .with_context(|| format!("look up user {}", name))?
                    .ok_or_else(|| anyhow!("user '{}' does not exist", name))?
                    .uid,
            ),
            None => None,
        };
        let gid = match &self.group {
            Some(name) => Some(
                Group::from_name(name)
                    .with_context(|| format!("look up group {}", name))?
                    .ok_or_else(|| anyhow!("group '{}' does not exist", name))?
                    .gid,
            ),
            None => None,
        };
        chown(path, uid, gid).with_context(|| {
            format!(
                "chown {}:{} {}",
                self.user.as_deref().unwrap_or(""),
                self.group.as_deref().unwrap_or(""),
                path.display()
            )
        })
    }
}
