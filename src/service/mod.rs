//! Domain operations. Each function takes its collaborators explicitly so
//! handlers, background jobs and tests drive the same code.

pub mod attendance;
pub mod bulk;
pub mod leave;
pub mod training;
pub mod users;

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::Utc;

    use crate::model::role::Role;
    use crate::model::user::{NewUser, User};
    use crate::store::{MemoryStore, Store};

    pub async fn seed_user(store: &MemoryStore, username: &str, role: Role) -> User {
        store
            .insert_user(NewUser {
                username: username.into(),
                email: format!("{username}@example.com"),
                name: username.into(),
                role,
                department: Some("Engineering".into()),
                position: None,
                employee_id: None,
                qr_code: Some(format!("QR-{username}")),
                join_date: Utc::now().date_naive(),
                password_hash: None,
            })
            .await
            .unwrap()
    }
}
