//! Test identities and scoped switching of the process's effective identity.
//!
//! The effective uid/gid is process-wide state. Switching goes through
//! [`assume`], which holds a process-wide lock for the lifetime of the
//! returned [`Assumed`] guard and restores the original identity when the
//! guard drops, so an identity never outlives the probe it was set up for.

use std::sync::{Mutex, MutexGuard, OnceLock};

use nix::unistd::{getegid, geteuid, Gid, Uid, User};

use crate::errors::HarnessError;

/// A user the permission matrix is materialized for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestIdentity {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
    /// Supplementary groups, including `gid`.
    pub groups: Vec<u32>,
}

impl TestIdentity {
    pub fn new(name: impl Into<String>, uid: u32, gid: u32, groups: Vec<u32>) -> Self {
        let mut groups = groups;
        if !groups.contains(&gid) {
            groups.insert(0, gid);
        }
        TestIdentity {
            name: name.into(),
            uid,
            gid,
            groups,
        }
    }

    /// Resolve a system account by name, including its group memberships.
    pub fn lookup(name: &str) -> Result<Self, HarnessError> {
        let user = User::from_name(name)
            .map_err(|source| HarnessError::Identity {
                name: name.to_string(),
                source,
            })?
            .ok_or_else(|| HarnessError::UnknownIdentity(name.to_string()))?;
        let groups = supplementary_groups(&user)?;
        Ok(TestIdentity::new(
            name,
            user.uid.as_raw(),
            user.gid.as_raw(),
            groups,
        ))
    }

    /// An identity named `name` that is really the running process.
    ///
    /// Useful for unprivileged runs where fixtures cannot be chowned.
    pub fn current(name: impl Into<String>) -> Self {
        let gid = getegid().as_raw();
        TestIdentity::new(name, geteuid().as_raw(), gid, vec![gid])
    }

    pub fn is_member(&self, gid: u32) -> bool {
        self.groups.contains(&gid)
    }
}

#[cfg(target_os = "linux")]
fn supplementary_groups(user: &User) -> Result<Vec<u32>, HarnessError> {
    let cname = std::ffi::CString::new(user.name.as_str())
        .map_err(|_| HarnessError::UnknownIdentity(user.name.clone()))?;
    let gids = nix::unistd::getgrouplist(&cname, user.gid).map_err(|source| {
        HarnessError::Identity {
            name: user.name.clone(),
            source,
        }
    })?;
    Ok(gids.into_iter().map(Gid::as_raw).collect())
}

#[cfg(not(target_os = "linux"))]
fn supplementary_groups(user: &User) -> Result<Vec<u32>, HarnessError> {
    Ok(vec![user.gid.as_raw()])
}

/// Switches the identity probes run under.
pub trait IdentitySwitch {
    /// Make `id` the effective identity.
    fn assume(&self, id: &TestIdentity) -> Result<(), HarnessError>;
    /// Return to the identity in effect before `assume`.
    fn restore(&self) -> Result<(), HarnessError>;
    /// Whether the setup identity may create entries on behalf of others.
    fn is_privileged(&self) -> bool;
}

fn identity_lock() -> MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Scoped identity override; restores on drop.
pub struct Assumed<'a> {
    switch: &'a dyn IdentitySwitch,
    name: String,
    _lock: MutexGuard<'static, ()>,
}

impl std::fmt::Debug for Assumed<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assumed").field("name", &self.name).finish()
    }
}

impl Drop for Assumed<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.switch.restore() {
            tracing::error!("failed to restore identity after `{}`: {}", self.name, e);
        }
    }
}

/// Run under `id` until the returned guard is dropped.
pub fn assume<'a>(
    switch: &'a dyn IdentitySwitch,
    id: &TestIdentity,
) -> Result<Assumed<'a>, HarnessError> {
    let lock = identity_lock();
    if let Err(e) = switch.assume(id) {
        // A partial switch (groups set, uid not) must not leak.
        let _ = switch.restore();
        return Err(e);
    }
    Ok(Assumed {
        switch,
        name: id.name.clone(),
        _lock: lock,
    })
}

/// Switches the real process identity with `seteuid`/`setegid`.
///
/// Requires the process to start as root.
#[derive(Debug, Clone)]
pub struct ProcessIdentity {
    uid: Uid,
    gid: Gid,
    groups: Vec<Gid>,
}

impl ProcessIdentity {
    /// Remember the current identity so it can be restored.
    pub fn capture() -> Result<Self, HarnessError> {
        Ok(ProcessIdentity {
            uid: geteuid(),
            gid: getegid(),
            groups: current_groups()?,
        })
    }
}

#[cfg(target_os = "linux")]
fn current_groups() -> Result<Vec<Gid>, HarnessError> {
    nix::unistd::getgroups().map_err(|source| HarnessError::Identity {
        name: "<setup>".to_string(),
        source,
    })
}

#[cfg(not(target_os = "linux"))]
fn current_groups() -> Result<Vec<Gid>, HarnessError> {
    Ok(vec![getegid()])
}

#[cfg(target_os = "linux")]
fn set_groups(groups: &[Gid]) -> nix::Result<()> {
    nix::unistd::setgroups(groups)
}

#[cfg(not(target_os = "linux"))]
fn set_groups(_groups: &[Gid]) -> nix::Result<()> {
    Ok(())
}

impl IdentitySwitch for ProcessIdentity {
    fn assume(&self, id: &TestIdentity) -> Result<(), HarnessError> {
        let fail = |source| HarnessError::Identity {
            name: id.name.clone(),
            source,
        };
        let groups: Vec<Gid> = id.groups.iter().copied().map(Gid::from_raw).collect();
        // Groups and gid first: dropping the uid removes the right to change them.
        set_groups(&groups).map_err(fail)?;
        nix::unistd::setegid(Gid::from_raw(id.gid)).map_err(fail)?;
        nix::unistd::seteuid(Uid::from_raw(id.uid)).map_err(fail)?;
        Ok(())
    }

    fn restore(&self) -> Result<(), HarnessError> {
        let fail = |source| HarnessError::Identity {
            name: "<setup>".to_string(),
            source,
        };
        nix::unistd::seteuid(self.uid).map_err(fail)?;
        nix::unistd::setegid(self.gid).map_err(fail)?;
        set_groups(&self.groups).map_err(fail)?;
        Ok(())
    }

    fn is_privileged(&self) -> bool {
        self.uid.is_root()
    }
}

/// Never switches; probes run as the process itself.
///
/// For simulated filesystems without privilege separation, or for runs that
/// are not root.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unswitched;

impl IdentitySwitch for Unswitched {
    fn assume(&self, _id: &TestIdentity) -> Result<(), HarnessError> {
        Ok(())
    }

    fn restore(&self) -> Result<(), HarnessError> {
        Ok(())
    }

    fn is_privileged(&self) -> bool {
        geteuid().is_root()
    }
}
