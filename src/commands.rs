//! Console commands

use chrono::NaiveDate;
use clap::{Args, Subcommand, ValueEnum};

use crate::directory::types::{format_birthday, Gender, User, UserDraft};

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
  /// List all users
  #[command(alias = "ls")]
  List,
  /// Show one user in detail
  Show { id: String },
  /// Find users by email (case-insensitive substring)
  Search { query: String },
  /// Add a new user
  Add(UserFields),
  /// Edit an existing user; omitted fields keep their value
  Update {
    id: String,
    #[command(flatten)]
    fields: UserPatch,
  },
  /// Delete a user
  #[command(alias = "rm")]
  Delete {
    id: String,
    /// Skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,
  },
  /// Show what the local mirror holds
  Mirror {
    /// Forget the mirror and the cached list
    #[arg(long)]
    clear: bool,
  },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GenderArg {
  Male,
  Female,
}

impl From<GenderArg> for Gender {
  fn from(value: GenderArg) -> Self {
    match value {
      GenderArg::Male => Gender::Male,
      GenderArg::Female => Gender::Female,
    }
  }
}

#[derive(Args, Debug, Clone)]
pub struct UserFields {
  #[arg(long)]
  pub username: String,
  #[arg(long)]
  pub email: String,
  #[arg(long)]
  pub first_name: String,
  #[arg(long)]
  pub last_name: String,
  /// Local phone number, without the +62 prefix
  #[arg(long)]
  pub phone: String,
  #[arg(long, value_enum)]
  pub gender: GenderArg,
  /// Birth date as YYYY-MM-DD
  #[arg(long)]
  pub birthdate: Option<NaiveDate>,
}

impl UserFields {
  pub fn into_draft(self) -> UserDraft {
    UserDraft {
      id: None,
      username: self.username,
      email: self.email,
      first_name: self.first_name,
      last_name: self.last_name,
      gender: self.gender.into(),
      birthdate: self.birthdate,
      phone: self.phone,
    }
  }
}

#[derive(Args, Debug, Clone, Default)]
pub struct UserPatch {
  #[arg(long)]
  pub username: Option<String>,
  #[arg(long)]
  pub email: Option<String>,
  #[arg(long)]
  pub first_name: Option<String>,
  #[arg(long)]
  pub last_name: Option<String>,
  #[arg(long)]
  pub phone: Option<String>,
  #[arg(long, value_enum)]
  pub gender: Option<GenderArg>,
  #[arg(long)]
  pub birthdate: Option<NaiveDate>,
}

impl UserPatch {
  /// `user` with the given fields overridden.
  ///
  /// Fields that are not set keep their stored value as-is, including
  /// birthdays and genders the console would not produce itself.
  pub fn apply_to(self, user: &User) -> User {
    let mut user = user.clone();
    if let Some(v) = self.username {
      user.username = v;
    }
    if let Some(v) = self.email {
      user.email = v;
    }
    if let Some(v) = self.first_name {
      user.profile.first_name = v;
    }
    if let Some(v) = self.last_name {
      user.profile.last_name = v;
    }
    if let Some(v) = self.phone {
      user.profile.phone = v;
    }
    if let Some(v) = self.gender {
      user.profile.gender = Gender::from(v).to_string();
    }
    if let Some(v) = self.birthdate {
      user.profile.birthday = format_birthday(v);
    }
    user
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::directory::types::{Account, Financial, Profile};

  fn user() -> User {
    User {
      id: "u1".to_string(),
      username: "budi".to_string(),
      email: "budi@example.com".to_string(),
      profile: Profile {
        first_name: "Budi".to_string(),
        last_name: "Santoso".to_string(),
        gender: "male".to_string(),
        birthday: "15/08/88".to_string(),
        phone: "8111".to_string(),
      },
      financial: None,
    }
  }

  #[test]
  fn test_empty_patch_keeps_user() {
    assert_eq!(UserPatch::default().apply_to(&user()), user());
  }

  #[test]
  fn test_patch_keeps_unformatted_profile_fields() {
    let mut stored = user();
    stored.profile.birthday = "1990-05-01".to_string();
    stored.profile.gender = "other".to_string();
    stored.financial = Some(Financial {
      accounts: vec![Account {
        account_id: "a1".to_string(),
        balance: 250.0,
        account_type: "savings".to_string(),
        transactions: Vec::new(),
      }],
    });

    let patch = UserPatch {
      email: Some("budi@new.example".to_string()),
      ..Default::default()
    };
    let updated = patch.apply_to(&stored);

    assert_eq!(updated.email, "budi@new.example");
    assert_eq!(updated.profile.birthday, "1990-05-01");
    assert_eq!(updated.profile.gender, "other");
    assert_eq!(updated.financial, stored.financial);
  }

  #[test]
  fn test_patch_formats_new_birthdate() {
    let patch = UserPatch {
      birthdate: NaiveDate::from_ymd_opt(1990, 5, 1),
      ..Default::default()
    };
    assert_eq!(patch.apply_to(&user()).profile.birthday, "01/05/90");
  }

  #[test]
  fn test_patch_overrides_fields() {
    let patch = UserPatch {
      email: Some("b@new.example".to_string()),
      gender: Some(GenderArg::Female),
      ..Default::default()
    };

    let updated = patch.apply_to(&user());
    assert_eq!(updated.id, "u1");
    assert_eq!(updated.email, "b@new.example");
    assert_eq!(updated.profile.gender, "female");
    assert_eq!(updated.username, "budi");
  }

  #[test]
  fn test_fields_make_new_draft() {
    let fields = UserFields {
      username: "sari".to_string(),
      email: "sari@example.com".to_string(),
      first_name: "Sari".to_string(),
      last_name: "Dewi".to_string(),
      phone: "8222".to_string(),
      gender: GenderArg::Female,
      birthdate: None,
    };

    let draft = fields.into_draft();
    assert!(draft.id.is_none());
    assert_eq!(draft.gender, Gender::Female);
  }
}
