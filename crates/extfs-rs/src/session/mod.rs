//! Explicit session state: the mount registry and the current login.
//!
//! Every filesystem handle handed out by a [`Session`] is opened fresh from the registered
//! disk range, so a session never holds a mapping between calls.


use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::info;

use crate::constants::ROOT_USER;
use crate::error::{FsError, FsResult};
use crate::fs::{FileSystem, FormatOptions};
use crate::retention::disk::Disk;
use crate::retention::partition::Partition;
use crate::users::UsersTable;

/// A partition registered under an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountedPartition {
    pub id: String,
    pub name: String,
    pub disk_path: PathBuf,
    pub start: u64,
    pub size: u64,
}

/// The logged-in user and the mount it logged into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Login {
    pub user: String,
    pub group: String,
    pub uid: u32,
    pub gid: u32,
    pub mount_id: String,
}

#[derive(Debug, Default)]
pub struct Session {
    mounts: BTreeMap<String, MountedPartition>,
    login: Option<Login>,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `mount` registers `size` bytes at `start` of the image at `disk_path` under `id`.
    /// The range is checked against the image; the partition does not need to be formatted.
    ///
    /// # Errors
    /// Fails if `id` is taken, the image cannot be opened, or the range does not fit.
    pub fn mount(
        &mut self,
        id: &str,
        name: &str,
        disk_path: impl AsRef<Path>,
        start: u64,
        size: u64,
    ) -> anyhow::Result<&MountedPartition> {
        if self.mounts.contains_key(id) {
            anyhow::bail!("partition id {id} is already mounted");
        }
        let disk_path = disk_path.as_ref().to_path_buf();
        let disk = Disk::open(&disk_path)?;
        Partition::new(disk, start, size)
            .with_context(|| format!("cannot mount {name} as {id}"))?;

        info!(id, name, disk = %disk_path.display(), start, size, "mounted partition");
        let entry = self.mounts.entry(id.to_owned()).or_insert(MountedPartition {
            id: id.to_owned(),
            name: name.to_owned(),
            disk_path,
            start,
            size,
        });
        Ok(entry)
    }

    /// `unmount` drops `id` from the registry.
    ///
    /// # Errors
    /// Fails if `id` is unknown or the current login uses it.
    pub fn unmount(&mut self, id: &str) -> anyhow::Result<MountedPartition> {
        if self.login.as_ref().is_some_and(|l| l.mount_id == id) {
            anyhow::bail!("partition {id} is in use by the current login");
        }
        let mounted = self
            .mounts
            .remove(id)
            .ok_or_else(|| FsError::UnknownMount(id.to_owned()))?;
        info!(id, "unmounted partition");
        Ok(mounted)
    }

    pub fn mounts(&self) -> impl Iterator<Item = &MountedPartition> {
        self.mounts.values()
    }

    /// # Errors
    /// Fails with [`FsError::UnknownMount`] for an unregistered id.
    pub fn mounted(&self, id: &str) -> FsResult<&MountedPartition> {
        self.mounts
            .get(id)
            .ok_or_else(|| FsError::UnknownMount(id.to_owned()))
    }

    /// `open_partition` maps the registered range of `id`.
    ///
    /// # Errors
    /// Fails if `id` is unknown or the image can no longer be opened.
    pub fn open_partition(&self, id: &str) -> anyhow::Result<Partition> {
        let mounted = self.mounted(id)?;
        let disk = Disk::open(&mounted.disk_path)?;
        Partition::new(disk, mounted.start, mounted.size)
    }

    /// `format` lays a fresh filesystem over the partition registered as `id`.
    ///
    /// # Errors
    /// Fails if `id` is unknown or formatting fails.
    pub fn format(&self, id: &str, options: FormatOptions) -> anyhow::Result<FileSystem> {
        let part = self.open_partition(id)?;
        let fs = FileSystem::format(part, options)
            .with_context(|| format!("failed to format partition {id}"))?;
        fs.sync()?;
        Ok(fs)
    }

    /// `login` checks the credentials against the users file of `mount_id`.
    ///
    /// # Errors
    /// Fails if someone is already logged in, the mount is unknown or unformatted, or the
    /// credentials do not match a live user.
    pub fn login(&mut self, user: &str, password: &str, mount_id: &str) -> anyhow::Result<&Login> {
        if let Some(current) = &self.login {
            return Err(FsError::AlreadyLoggedIn(current.user.clone()).into());
        }
        let fs = FileSystem::open(self.open_partition(mount_id)?)?;
        let table = fs.load_users()?;
        let identity = table.authenticate(user, password)?;
        let group = table
            .find_user(user)
            .map(|u| u.group.clone())
            .unwrap_or_default();

        info!(user, mount = mount_id, uid = identity.uid, "logged in");
        Ok(self.login.insert(Login {
            user: user.to_owned(),
            group,
            uid: identity.uid,
            gid: identity.gid,
            mount_id: mount_id.to_owned(),
        }))
    }

    /// # Errors
    /// Fails with [`FsError::NotLoggedIn`] when nobody is logged in.
    pub fn logout(&mut self) -> FsResult<Login> {
        let login = self.login.take().ok_or(FsError::NotLoggedIn)?;
        info!(user = %login.user, "logged out");
        Ok(login)
    }

    #[must_use]
    pub const fn current(&self) -> Option<&Login> {
        self.login.as_ref()
    }

    /// `open_fs` mounts the filesystem of the current login, stamping new inodes with the
    /// logged-in identity.
    ///
    /// # Errors
    /// Fails when nobody is logged in or the partition cannot be mounted.
    pub fn open_fs(&self) -> anyhow::Result<FileSystem> {
        let login = self.login.as_ref().ok_or(FsError::NotLoggedIn)?;
        let mut fs = FileSystem::mount(self.open_partition(&login.mount_id)?)?;
        fs.set_owner(crate::fs::Owner {
            uid: login.uid,
            gid: login.gid,
        });
        Ok(fs)
    }

    /// `open_mount` mounts the filesystem registered as `id` without a login. It serves
    /// maintenance work that must run while the users file is unreadable, such as inspecting
    /// the journal or recovering after a loss.
    ///
    /// # Errors
    /// Fails if `id` is unknown or the partition is not formatted.
    pub fn open_mount(&self, id: &str) -> anyhow::Result<FileSystem> {
        let fs = FileSystem::mount(self.open_partition(id)?)
            .with_context(|| format!("cannot open partition {id}"))?;
        Ok(fs)
    }

    fn require_root(&self) -> FsResult<&Login> {
        let login = self.login.as_ref().ok_or(FsError::NotLoggedIn)?;
        if login.user != ROOT_USER {
            return Err(FsError::PermissionDenied);
        }
        Ok(login)
    }

    /// `edit_users` applies `change` to the users table of the current mount and writes the
    /// table back.
    fn edit_users<R>(
        &self,
        change: impl FnOnce(&mut UsersTable) -> FsResult<R>,
    ) -> anyhow::Result<R> {
        self.require_root()?;
        let mut fs = self.open_fs()?;
        let mut table = fs.load_users()?;
        let out = change(&mut table)?;
        fs.save_users(&table)?;
        fs.sync()?;
        Ok(out)
    }

    /// `mkgrp` adds a group and returns its id. Root only.
    ///
    /// # Errors
    /// Fails without a root login or if the group exists.
    pub fn mkgrp(&self, name: &str) -> anyhow::Result<u32> {
        let id = self.edit_users(|t| t.add_group(name))?;
        info!(group = name, id, "group created");
        Ok(id)
    }

    /// `rmgrp` removes a group and its users. Root only.
    ///
    /// # Errors
    /// Fails without a root login or if the group is missing.
    pub fn rmgrp(&self, name: &str) -> anyhow::Result<usize> {
        let users = self.edit_users(|t| t.remove_group(name))?;
        info!(group = name, users, "group removed");
        Ok(users)
    }

    /// `mkusr` adds a user to `group` and returns its id. Root only.
    ///
    /// # Errors
    /// Fails without a root login, on an invalid field, a missing group or a taken name.
    pub fn mkusr(&self, name: &str, password: &str, group: &str) -> anyhow::Result<u32> {
        let id = self.edit_users(|t| t.add_user(name, password, group))?;
        info!(user = name, group, id, "user created");
        Ok(id)
    }

    /// # Errors
    /// Fails without a root login or if the user is missing.
    pub fn rmusr(&self, name: &str) -> anyhow::Result<()> {
        self.edit_users(|t| t.remove_user(name))?;
        info!(user = name, "user removed");
        Ok(())
    }

    /// # Errors
    /// Fails without a root login or if the user or group is missing.
    pub fn chgrp(&self, user: &str, group: &str) -> anyhow::Result<()> {
        self.edit_users(|t| t.change_group(user, group))?;
        info!(user, group, "user moved");
        Ok(())
    }
}
