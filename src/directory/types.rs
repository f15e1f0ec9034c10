use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A user record as served by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
  pub id: String,
  pub username: String,
  pub email: String,
  pub profile: Profile,
  #[serde(default)]
  pub financial: Option<Financial>,
}

/// Personal details of a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
  pub first_name: String,
  pub last_name: String,
  pub gender: String,
  /// Free-form date string, `DD/MM/YY` for users created locally
  pub birthday: String,
  /// Local number without country prefix
  pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Financial {
  #[serde(default)]
  pub accounts: Vec<Account>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
  pub account_id: String,
  pub balance: f64,
  pub account_type: String,
  #[serde(default)]
  pub transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
  pub transaction_id: String,
  /// Signed amount, negative for debits
  pub amount: f64,
  pub timestamp: String,
}

impl User {
  pub fn full_name(&self) -> String {
    format!("{} {}", self.profile.first_name, self.profile.last_name)
  }

  /// Accounts of the user, empty when there is no financial data
  pub fn accounts(&self) -> &[Account] {
    self
      .financial
      .as_ref()
      .map(|f| f.accounts.as_slice())
      .unwrap_or_default()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
  Male,
  Female,
}

impl fmt::Display for Gender {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Gender::Male => write!(f, "male"),
      Gender::Female => write!(f, "female"),
    }
  }
}

/// Input for creating or editing a user.
///
/// A draft without `id` describes a new user.
#[derive(Debug, Clone, PartialEq)]
pub struct UserDraft {
  pub id: Option<String>,
  pub username: String,
  pub email: String,
  pub first_name: String,
  pub last_name: String,
  pub gender: Gender,
  pub birthdate: Option<NaiveDate>,
  pub phone: String,
}

impl UserDraft {
  /// Build the user record for this draft, generating an id if missing.
  ///
  /// Drafts never carry financial data.
  pub fn into_user(self) -> User {
    let id = self
      .id
      .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    User {
      id,
      username: self.username,
      email: self.email,
      profile: Profile {
        first_name: self.first_name,
        last_name: self.last_name,
        gender: self.gender.to_string(),
        birthday: self.birthdate.map(format_birthday).unwrap_or_default(),
        phone: self.phone,
      },
      financial: None,
    }
  }
}

/// Birth date in the `DD/MM/YY` form the console writes.
pub fn format_birthday(date: NaiveDate) -> String {
  date.format("%d/%m/%y").to_string()
}
