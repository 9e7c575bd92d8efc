//! Emergency contacts, one list per user.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::uuid::uuidv7;

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_PHONE_LEN: usize = 20;
pub const MAX_RELATIONSHIP_LEN: usize = 50;

#[derive(Debug, Error)]
pub enum ContactError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Emergency contact not found")]
    NotFound,

    #[error("Contact with this phone number already exists")]
    Duplicate,

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct EmergencyContact {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub phone_number: String,
    pub relationship_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewContact {
    pub name: String,
    pub phone_number: String,
    pub relationship_type: Option<String>,
}

fn check_len(field: &str, value: &str, max: usize) -> Result<(), ContactError> {
    if value.chars().count() > max {
        return Err(ContactError::Validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(())
}

impl NewContact {
    /// Trim fields and enforce column limits. Name and phone are required.
    pub fn validated(self) -> Result<Self, ContactError> {
        let name = self.name.trim().to_string();
        let phone_number = self.phone_number.trim().to_string();
        let relationship_type = self
            .relationship_type
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());

        if name.is_empty() {
            return Err(ContactError::Validation("name is required".into()));
        }
        if phone_number.is_empty() {
            return Err(ContactError::Validation("phone_number is required".into()));
        }
        check_len("name", &name, MAX_NAME_LEN)?;
        check_len("phone_number", &phone_number, MAX_PHONE_LEN)?;
        if let Some(r) = &relationship_type {
            check_len("relationship_type", r, MAX_RELATIONSHIP_LEN)?;
        }
        Ok(Self {
            name,
            phone_number,
            relationship_type,
        })
    }
}

pub async fn create_contact(
    pool: &PgPool,
    user_id: Uuid,
    contact: NewContact,
) -> Result<EmergencyContact, ContactError> {
    let contact = contact.validated()?;
    sqlx::query_as::<_, EmergencyContact>(
        r#"
        INSERT INTO emergency_contacts (id, user_id, name, phone_number, relationship_type)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, user_id, name, phone_number, relationship_type, created_at
        "#,
    )
    .bind(uuidv7())
    .bind(user_id)
    .bind(&contact.name)
    .bind(&contact.phone_number)
    .bind(&contact.relationship_type)
    .fetch_one(pool)
    .await
    .map_err(duplicate_or_db)
}

fn duplicate_or_db(e: sqlx::Error) -> ContactError {
    if let sqlx::Error::Database(db) = &e
        && db.is_unique_violation()
    {
        return ContactError::Duplicate;
    }
    ContactError::Db(e)
}

pub async fn list_contacts(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<EmergencyContact>, ContactError> {
    let rows = sqlx::query_as::<_, EmergencyContact>(
        r#"
        SELECT id, user_id, name, phone_number, relationship_type, created_at
        FROM emergency_contacts
        WHERE user_id = $1
        ORDER BY created_at
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn delete_contact(
    pool: &PgPool,
    user_id: Uuid,
    contact_id: Uuid,
) -> Result<(), ContactError> {
    let result = sqlx::query("DELETE FROM emergency_contacts WHERE id = $1 AND user_id = $2")
        .bind(contact_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ContactError::NotFound);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(name: &str, phone: &str, rel: Option<&str>) -> NewContact {
        NewContact {
            name: name.into(),
            phone_number: phone.into(),
            relationship_type: rel.map(Into::into),
        }
    }

    #[test]
    fn fields_are_trimmed() {
        let c = contact("  Mum ", " +44 7700 900123 ", Some("  "))
            .validated()
            .unwrap();
        assert_eq!(c.name, "Mum");
        assert_eq!(c.phone_number, "+44 7700 900123");
        assert_eq!(c.relationship_type, None);
    }

    #[test]
    fn required_fields() {
        assert!(contact(" ", "123", None).validated().is_err());
        assert!(contact("Dad", "", None).validated().is_err());
    }

    #[test]
    fn length_limits() {
        assert!(contact(&"n".repeat(100), "1", None).validated().is_ok());
        assert!(contact(&"n".repeat(101), "1", None).validated().is_err());
        assert!(contact("a", &"1".repeat(21), None).validated().is_err());
        assert!(
            contact("a", "1", Some(&"r".repeat(51)))
                .validated()
                .is_err()
        );
    }
}
