//! Users file: comma-separated group and user rows kept in `/users.txt`.
//!
//! Rows are `id,G,name` and `id,U,group,name,password`. Removal is logical: the row stays and
//! its id becomes `0`. Every change rewrites the whole file.

#[cfg(test)]
mod users_tests;

use tracing::debug;

use crate::constants::{ACCOUNT_FIELD_LEN, ROOT_USER, USERS_FILE};
use crate::error::{FsError, FsResult};
use crate::fs::{FileSystem, Owner, join_path};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: u32,
    pub group: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Group(Group),
    User(User),
}

impl Record {
    #[must_use]
    pub const fn id(&self) -> u32 {
        match self {
            Self::Group(g) => g.id,
            Self::User(u) => u.id,
        }
    }

    #[must_use]
    pub const fn is_removed(&self) -> bool {
        self.id() == 0
    }

    fn parse(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        match fields.as_slice() {
            [id, "G", name] => Some(Self::Group(Group {
                id: id.parse().ok()?,
                name: (*name).to_owned(),
            })),
            [id, "U", group, name, password] => Some(Self::User(User {
                id: id.parse().ok()?,
                group: (*group).to_owned(),
                name: (*name).to_owned(),
                password: (*password).to_owned(),
            })),
            _ => None,
        }
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Group(g) => write!(f, "{},G,{}", g.id, g.name),
            Self::User(u) => write!(f, "{},U,{},{},{}", u.id, u.group, u.name, u.password),
        }
    }
}

/// Numeric identity of an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub uid: u32,
    pub gid: u32,
}

impl From<Identity> for Owner {
    fn from(id: Identity) -> Self {
        Self {
            uid: id.uid,
            gid: id.gid,
        }
    }
}

/// validate_field bounds an account name or password to [`ACCOUNT_FIELD_LEN`] characters
/// without separators.
///
/// # Errors
/// Fails with [`FsError::InvalidName`] or [`FsError::NameTooLong`].
pub fn validate_field(field: &str) -> FsResult<()> {
    if field.trim().is_empty() || field.contains([',', '\n', '\r']) {
        return Err(FsError::InvalidName(field.to_owned()));
    }
    if field.chars().count() > ACCOUNT_FIELD_LEN {
        return Err(FsError::NameTooLong {
            name: field.to_owned(),
            max: ACCOUNT_FIELD_LEN,
        });
    }
    Ok(())
}

/// Parsed users file. Row order is preserved across a load/save cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsersTable {
    records: Vec<Record>,
}

impl UsersTable {
    /// # Errors
    /// Fails with [`FsError::MalformedUsers`] on the first row that is neither a group nor
    /// a user. Blank lines are ignored.
    pub fn parse(text: &str) -> FsResult<Self> {
        let mut records = Vec::new();
        for (i, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record = Record::parse(line).ok_or_else(|| FsError::MalformedUsers {
                line: i + 1,
                text: line.to_owned(),
            })?;
            records.push(record);
        }
        Ok(Self { records })
    }

    #[must_use]
    pub fn render(&self) -> String {
        self.records.iter().map(|r| format!("{r}\n")).collect()
    }

    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.records.iter().filter_map(|r| match r {
            Record::Group(g) if g.id != 0 => Some(g),
            _ => None,
        })
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.records.iter().filter_map(|r| match r {
            Record::User(u) if u.id != 0 => Some(u),
            _ => None,
        })
    }

    #[must_use]
    pub fn find_group(&self, name: &str) -> Option<&Group> {
        self.groups().find(|g| g.name == name)
    }

    #[must_use]
    pub fn find_user(&self, name: &str) -> Option<&User> {
        self.users().find(|u| u.name == name)
    }

    fn next_group_id(&self) -> u32 {
        let max = self.records.iter().filter_map(|r| match r {
            Record::Group(g) => Some(g.id),
            Record::User(_) => None,
        });
        max.max().unwrap_or(0) + 1
    }

    fn next_user_id(&self) -> u32 {
        let max = self.records.iter().filter_map(|r| match r {
            Record::User(u) => Some(u.id),
            Record::Group(_) => None,
        });
        max.max().unwrap_or(0) + 1
    }

    /// `add_group` appends a group row and returns its id.
    ///
    /// # Errors
    /// Fails if the name is invalid or a live group already uses it.
    pub fn add_group(&mut self, name: &str) -> FsResult<u32> {
        validate_field(name)?;
        if self.find_group(name).is_some() {
            return Err(FsError::GroupExists(name.to_owned()));
        }
        let id = self.next_group_id();
        self.records.push(Record::Group(Group {
            id,
            name: name.to_owned(),
        }));
        Ok(id)
    }

    /// `remove_group` tombstones the group and every user in it. Returns how many users
    /// were removed with it.
    ///
    /// # Errors
    /// Fails with [`FsError::GroupNotFound`] if no live group has that name, or
    /// [`FsError::PermissionDenied`] for the root group.
    pub fn remove_group(&mut self, name: &str) -> FsResult<usize> {
        if name == ROOT_USER {
            return Err(FsError::PermissionDenied);
        }
        if self.find_group(name).is_none() {
            return Err(FsError::GroupNotFound(name.to_owned()));
        }
        let mut users = 0;
        for record in &mut self.records {
            match record {
                Record::Group(g) if g.id != 0 && g.name == name => g.id = 0,
                Record::User(u) if u.id != 0 && u.group == name => {
                    u.id = 0;
                    users += 1;
                }
                _ => {}
            }
        }
        Ok(users)
    }

    /// `add_user` appends a user row in `group` and returns its id.
    ///
    /// # Errors
    /// Fails if a field is invalid, the group is missing, or the name is taken.
    pub fn add_user(&mut self, name: &str, password: &str, group: &str) -> FsResult<u32> {
        validate_field(name)?;
        validate_field(password)?;
        validate_field(group)?;
        if self.find_group(group).is_none() {
            return Err(FsError::GroupNotFound(group.to_owned()));
        }
        if self.find_user(name).is_some() {
            return Err(FsError::UserExists(name.to_owned()));
        }
        let id = self.next_user_id();
        self.records.push(Record::User(User {
            id,
            group: group.to_owned(),
            name: name.to_owned(),
            password: password.to_owned(),
        }));
        Ok(id)
    }

    /// # Errors
    /// Fails with [`FsError::UserNotFound`] if no live user has that name, or
    /// [`FsError::PermissionDenied`] for root.
    pub fn remove_user(&mut self, name: &str) -> FsResult<()> {
        if name == ROOT_USER {
            return Err(FsError::PermissionDenied);
        }
        let user = self
            .live_user_mut(name)
            .ok_or_else(|| FsError::UserNotFound(name.to_owned()))?;
        user.id = 0;
        Ok(())
    }

    /// # Errors
    /// Fails if the user or the target group does not exist.
    pub fn change_group(&mut self, name: &str, group: &str) -> FsResult<()> {
        if self.find_group(group).is_none() {
            return Err(FsError::GroupNotFound(group.to_owned()));
        }
        let user = self
            .live_user_mut(name)
            .ok_or_else(|| FsError::UserNotFound(name.to_owned()))?;
        user.group = group.to_owned();
        Ok(())
    }

    /// `authenticate` checks a name/password pair against the live users.
    ///
    /// # Errors
    /// Fails with [`FsError::BadCredentials`] for an unknown user or wrong password.
    pub fn authenticate(&self, name: &str, password: &str) -> FsResult<Identity> {
        let user = self
            .find_user(name)
            .filter(|u| u.password == password)
            .ok_or_else(|| FsError::BadCredentials(name.to_owned()))?;
        let gid = self.find_group(&user.group).map_or(0, |g| g.id);
        Ok(Identity { uid: user.id, gid })
    }

    fn live_user_mut(&mut self, name: &str) -> Option<&mut User> {
        self.records.iter_mut().find_map(|r| match r {
            Record::User(u) if u.id != 0 && u.name == name => Some(u),
            _ => None,
        })
    }
}

impl FileSystem {
    /// `load_users` parses `/users.txt`.
    ///
    /// # Errors
    /// Fails if the file is missing, not UTF-8, or malformed.
    pub fn load_users(&self) -> FsResult<UsersTable> {
        let raw = self.read_file(&join_path(&[], USERS_FILE))?;
        let text = String::from_utf8(raw)
            .map_err(|_| FsError::Corrupt(format!("{USERS_FILE} is not valid UTF-8")))?;
        UsersTable::parse(&text)
    }

    /// `save_users` rewrites `/users.txt` with the rendered table. The rewrite is not
    /// journaled.
    ///
    /// # Errors
    /// Fails if the file is missing or space runs out.
    pub fn save_users(&mut self, table: &UsersTable) -> FsResult<()> {
        let (index, mut inode) = self.file_at(&join_path(&[], USERS_FILE))?;
        let text = table.render();
        self.write_data(&mut inode, text.as_bytes())?;
        self.store_inode(index, &inode)?;
        debug!(bytes = text.len(), rows = table.records.len(), "rewrote users file");
        Ok(())
    }
}
