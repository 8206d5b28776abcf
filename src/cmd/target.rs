use anyhow::Result;
use serde_json::json;

use dosekeeper::core::clock::{Clock, SystemClock};
use dosekeeper::error::Error;
use dosekeeper::output;

use super::{Session, print_json};

pub fn run_set(user: Option<&str>, token: &str, human: bool) -> Result<()> {
    let token = token.trim();
    if token.is_empty() {
        return Err(Error::validation("delivery token must not be empty").into());
    }
    let s = Session::open(user)?;
    let target = s.db.set_delivery_target(&s.user_id, token, SystemClock.now())?;

    if human {
        println!("Reminders for {} will go to {}", target.user_id, target.token);
    } else {
        print_json(&output::success("target_set", json!({ "target": target })))?;
    }
    Ok(())
}

pub fn run_show(user: Option<&str>, human: bool) -> Result<()> {
    let s = Session::open(user)?;
    let target = s
        .db
        .get_delivery_target(&s.user_id)?
        .ok_or_else(|| Error::MissingDeliveryTarget {
            user: s.user_id.clone(),
        })?;

    if human {
        println!(
            "{} -> {} (updated {})",
            target.user_id,
            target.token,
            target.updated_at.format("%Y-%m-%d %H:%M")
        );
    } else {
        print_json(&output::success("target_show", json!({ "target": target })))?;
    }
    Ok(())
}

pub fn run_clear(user: Option<&str>, human: bool) -> Result<()> {
    let s = Session::open(user)?;
    let removed = s.db.remove_delivery_target(&s.user_id)?;

    if human {
        if removed {
            println!("Delivery target cleared for {}", s.user_id);
        } else {
            println!("No delivery target was set for {}", s.user_id);
        }
    } else {
        print_json(&output::success(
            "target_clear",
            json!({ "user": s.user_id, "removed": removed }),
        ))?;
    }
    Ok(())
}
