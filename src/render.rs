//! Plain-text rendering of users for the console.

use crate::directory::types::{Account, User};

/// Format an amount as Indonesian Rupiah, e.g. `Rp 1.234.567,50`.
pub fn currency(amount: f64) -> String {
  let cents = (amount * 100.0).round() as i64;
  let sign = if cents < 0 { "-" } else { "" };
  let cents = cents.unsigned_abs();

  let whole = (cents / 100).to_string();
  let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
  for (i, ch) in whole.chars().enumerate() {
    if i > 0 && (whole.len() - i) % 3 == 0 {
      grouped.push('.');
    }
    grouped.push(ch);
  }

  format!("{}Rp {},{:02}", sign, grouped, cents % 100)
}

/// Sum of all account balances.
pub fn total_balance(accounts: &[Account]) -> f64 {
  accounts.iter().map(|a| a.balance).sum()
}

/// Upper-case initials from first and last name.
pub fn initials(first_name: &str, last_name: &str) -> String {
  [first_name, last_name]
    .iter()
    .filter_map(|name| name.trim().chars().next())
    .flat_map(char::to_uppercase)
    .collect()
}

/// Phone number with the country prefix.
pub fn phone(local: &str) -> String {
  format!("+62{}", local)
}

/// Phone number in domestic form, as shown in the user table.
pub fn local_phone(local: &str) -> String {
  format!("0{}", local)
}

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// One table row per user: id, full name, email, phone, total balance.
pub fn user_row(user: &User) -> String {
  format!(
    "{:<36}  {:<24}  {:<28}  {:<14}  {}",
    user.id,
    truncate(&user.full_name(), 24),
    truncate(&user.email, 28),
    local_phone(&user.profile.phone),
    currency(total_balance(user.accounts())),
  )
}

pub fn table_header() -> String {
  format!(
    "{:<36}  {:<24}  {:<28}  {:<14}  {}",
    "ID", "FULL NAME", "EMAIL", "PHONE", "TOTAL BALANCE"
  )
}

/// Multi-line detail view of a user including accounts and transactions.
pub fn user_detail(user: &User) -> String {
  let mut lines = vec![
    format!(
      "[{}] {}",
      initials(&user.profile.first_name, &user.profile.last_name),
      user.full_name()
    ),
    format!("  Username       {}", user.username),
    format!("  E-mail         {}", user.email),
    format!("  Phone Number   {}", phone(&user.profile.phone)),
    format!("  Gender         {}", user.profile.gender),
    format!("  Birthday       {}", user.profile.birthday),
    format!(
      "  Total Balance  {}",
      currency(total_balance(user.accounts()))
    ),
  ];

  if user.accounts().is_empty() {
    lines.push("  No accounts".to_string());
  }

  for account in user.accounts() {
    lines.push(format!(
      "  Account {} ({})  {}",
      account.account_id,
      account.account_type,
      currency(account.balance)
    ));
    for tx in &account.transactions {
      lines.push(format!(
        "    {}  {:>20}  {}",
        tx.timestamp,
        currency(tx.amount),
        tx.transaction_id
      ));
    }
  }

  lines.join("\n")
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::directory::types::{Financial, Profile, Transaction};

  fn account(balance: f64) -> Account {
    Account {
      account_id: "acc".to_string(),
      balance,
      account_type: "savings".to_string(),
      transactions: Vec::new(),
    }
  }

  #[test]
  fn test_currency_groups_thousands() {
    assert_eq!(currency(1234567.5), "Rp 1.234.567,50");
  }

  #[test]
  fn test_currency_small_and_zero() {
    assert_eq!(currency(0.0), "Rp 0,00");
    assert_eq!(currency(999.0), "Rp 999,00");
    assert_eq!(currency(1000.0), "Rp 1.000,00");
  }

  #[test]
  fn test_currency_negative() {
    assert_eq!(currency(-2500.25), "-Rp 2.500,25");
  }

  #[test]
  fn test_total_balance() {
    assert_eq!(total_balance(&[account(100.0), account(250.5)]), 350.5);
    assert_eq!(total_balance(&[]), 0.0);
  }

  #[test]
  fn test_initials() {
    assert_eq!(initials("budi", "santoso"), "BS");
    assert_eq!(initials("Budi", ""), "B");
  }

  #[test]
  fn test_truncate() {
    assert_eq!(truncate("hello", 5), "hello");
    assert_eq!(truncate("hello world", 8), "hello...");
  }

  #[test]
  fn test_row_uses_domestic_phone() {
    let user = User {
      id: "1".to_string(),
      username: "budi".to_string(),
      email: "budi@example.com".to_string(),
      profile: Profile {
        first_name: "Budi".to_string(),
        last_name: "Santoso".to_string(),
        gender: "male".to_string(),
        birthday: "01/01/90".to_string(),
        phone: "8111".to_string(),
      },
      financial: None,
    };

    let row = user_row(&user);
    assert!(row.contains("08111"));
    assert!(!row.contains("+62"));
    assert!(user_detail(&user).contains("+628111"));
  }

  #[test]
  fn test_detail_lists_transactions() {
    let user = User {
      id: "1".to_string(),
      username: "budi".to_string(),
      email: "budi@example.com".to_string(),
      profile: Profile {
        first_name: "Budi".to_string(),
        last_name: "Santoso".to_string(),
        gender: "male".to_string(),
        birthday: "01/01/90".to_string(),
        phone: "8111".to_string(),
      },
      financial: Some(Financial {
        accounts: vec![Account {
          account_id: "a1".to_string(),
          balance: 1000.0,
          account_type: "checking".to_string(),
          transactions: vec![Transaction {
            transaction_id: "t1".to_string(),
            amount: -50.0,
            timestamp: "2024-05-01T10:00:00Z".to_string(),
          }],
        }],
      }),
    };

    let detail = user_detail(&user);
    assert!(detail.starts_with("[BS] Budi Santoso"));
    assert!(detail.contains("+628111"));
    assert!(detail.contains("Rp 1.000,00"));
    assert!(detail.contains("-Rp 50,00"));
    assert!(detail.contains("t1"));
  }
}
