use anyhow::Error;
use once_cell::sync::Lazy;
use rocket::serde::Serialize;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    ViewOwnProfile,
    EditOwnProfile,
    ViewOwnAssignments,
    LogOwnProgress,

    ViewAllAthletes,
    AssignWorkouts,
    CreateWorkouts,
    ManageAssignments,
    RegisterUsers,

    EditUserRoles,
    DeleteUsers,
    EditUserCredentials,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Role {
    Athlete,
    Coach,
    Admin,
}

static ATHLETE_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(|| {
    let mut permissions = HashSet::new();

    permissions.insert(Permission::ViewOwnProfile);
    permissions.insert(Permission::EditOwnProfile);
    permissions.insert(Permission::ViewOwnAssignments);
    permissions.insert(Permission::LogOwnProgress);

    permissions
});

static COACH_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(|| {
    let mut permissions = HashSet::new();

    permissions.extend(ATHLETE_PERMISSIONS.iter().copied());

    permissions.insert(Permission::ViewAllAthletes);
    permissions.insert(Permission::AssignWorkouts);
    permissions.insert(Permission::CreateWorkouts);
    permissions.insert(Permission::ManageAssignments);
    permissions.insert(Permission::RegisterUsers);

    permissions
});

static ADMIN_PERMISSIONS: Lazy<HashSet<Permission>> = Lazy::new(|| {
    let mut permissions = HashSet::new();

    permissions.extend(COACH_PERMISSIONS.iter().copied());

    permissions.insert(Permission::EditUserRoles);
    permissions.insert(Permission::DeleteUsers);
    permissions.insert(Permission::EditUserCredentials);

    permissions
});

impl Role {
    pub fn permissions(&self) -> &'static HashSet<Permission> {
        match self {
            Role::Athlete => &ATHLETE_PERMISSIONS,
            Role::Coach => &COACH_PERMISSIONS,
            Role::Admin => &ADMIN_PERMISSIONS,
        }
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::Athlete => "athlete",
            Role::Coach => "coach",
            Role::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "athlete" => Ok(Role::Athlete),
            "coach" => Ok(Role::Coach),
            "admin" => Ok(Role::Admin),
            _ => Err(Error::msg(format!("Unknown role: {}", s))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Athlete => write!(f, "athlete"),
            Role::Coach => write!(f, "coach"),
            Role::Admin => write!(f, "admin"),
        }
    }
}
