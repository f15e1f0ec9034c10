use color_eyre::{eyre::eyre, Result};
use std::io::{BufRead, Write};

use crate::cache::{CacheResult, CacheSource};
use crate::commands::Command;
use crate::config::Config;
use crate::directory::manager::UserManager;
use crate::directory::types::User;
use crate::render;

/// Console application state
pub struct App {
  manager: UserManager,
  /// Never contact the user service; work from the local mirror only
  offline: bool,
}

impl App {
  pub fn new(config: &Config, offline: bool) -> Result<Self> {
    let manager = UserManager::from_config(config)?;
    Ok(Self { manager, offline })
  }

  pub async fn run(&self, command: Command) -> Result<()> {
    match command {
      Command::List => {
        let users = self.load_users().await?;
        print_table(&users);
      }
      Command::Show { id } => {
        let user = self.find_user(&id).await?;
        println!("{}", render::user_detail(&user));
      }
      Command::Search { query } => {
        self.load_users().await?;
        let users = self.manager.search_users(&query)?;
        print_table(&users);
      }
      Command::Add(fields) => {
        let user = self.manager.save_user(fields.into_draft())?;
        println!("Added {} ({})", user.full_name(), user.id);
      }
      Command::Update { id, fields } => {
        let user = self.find_user(&id).await?;
        let users = self.manager.update_user(fields.apply_to(&user))?;
        println!("{}", outcome("Updated", &id, users.iter().any(|u| u.id == id)));
      }
      Command::Delete { id, yes } => {
        let user = self.find_user(&id).await?;
        if !yes && !confirm_delete(&user)? {
          println!("Cancelled");
          return Ok(());
        }
        let cached = self.manager.users()?.iter().any(|u| u.id == id);
        let users = self.manager.delete_user(&id)?;
        let removed = cached && users.iter().all(|u| u.id != id);
        println!("{}", outcome("Deleted", &id, removed));
      }
      Command::Mirror { clear } => {
        if clear {
          self.manager.reset()?;
          println!("Local mirror cleared");
        } else {
          match self.manager.mirror_status()? {
            Some((count, written_at)) => {
              println!("{} users, written {}", count, written_at.to_rfc3339())
            }
            None => println!("Local mirror is empty"),
          }
        }
      }
    }

    Ok(())
  }

  /// Load the user list, falling back to the local mirror on network errors.
  async fn load_users(&self) -> Result<Vec<User>> {
    let result = if self.offline {
      self.manager.cached_users()?
    } else {
      match self.manager.fetch_users().await {
        Ok(result) => result,
        Err(e) => {
          let cached = self.manager.cached_users()?;
          if cached.data.is_empty() {
            return Err(eyre!("Error loading data: {}", e));
          }
          eprintln!("Error loading data: {}", e);
          cached
        }
      }
    };

    report_source(&result);
    Ok(result.data)
  }

  async fn find_user(&self, id: &str) -> Result<User> {
    if self.offline {
      return self
        .manager
        .users()?
        .into_iter()
        .find(|u| u.id == id)
        .ok_or_else(|| eyre!("User {} is not in the local mirror", id));
    }
    self.manager.get_user(id).await
  }
}

fn report_source(result: &CacheResult<Vec<User>>) {
  tracing::debug!(
    source = result.source.label(),
    count = result.data.len(),
    "Serving users"
  );
  if result.source == CacheSource::Network {
    return;
  }
  match result.fetched_at {
    Some(at) => eprintln!(
      "(showing data from {}, fetched {})",
      result.source.label(),
      at.to_rfc3339()
    ),
    None => eprintln!("(showing data from {})", result.source.label()),
  }
}

/// Result line for a mutation that may not have matched a cached user.
fn outcome(action: &str, id: &str, applied: bool) -> String {
  if applied {
    format!("{} {}", action, id)
  } else {
    format!("User {} is not in the local list, nothing changed", id)
  }
}

fn print_table(users: &[User]) {
  if users.is_empty() {
    println!("No users");
    return;
  }
  println!("{}", render::table_header());
  for user in users {
    println!("{}", render::user_row(user));
  }
}

fn confirm_delete(user: &User) -> Result<bool> {
  println!("Are you sure you want to delete this user?");
  println!("  Full Name      {}", user.full_name());
  println!("  E-mail         {}", user.email);
  println!("  Phone Number   {}", render::phone(&user.profile.phone));
  print!("Delete? [y/N] ");
  std::io::stdout().flush()?;

  let mut answer = String::new();
  std::io::stdin().lock().read_line(&mut answer)?;
  Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_outcome_reports_applied_change() {
    assert_eq!(outcome("Deleted", "u1", true), "Deleted u1");
  }

  #[test]
  fn test_outcome_reports_missing_user() {
    assert_eq!(
      outcome("Deleted", "remote", false),
      "User remote is not in the local list, nothing changed"
    );
  }
}
