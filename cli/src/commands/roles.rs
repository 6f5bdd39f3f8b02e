use crew_core::api::{CliError, RoleRegistry};
use serde_json::json;

use super::cli::RolesArgs;

pub fn run(args: RolesArgs) -> Result<i32, CliError> {
    let registry = RoleRegistry::standard();
    if args.json {
        let value = roles_json(&registry);
        let text = serde_json::to_string_pretty(&value)
            .map_err(|e| CliError::Command(e.to_string()))?;
        println!("{text}");
    } else {
        println!("{}", roles_text(&registry));
    }
    Ok(0)
}

fn roles_json(registry: &RoleRegistry) -> serde_json::Value {
    let roles: Vec<_> = registry
        .profiles()
        .iter()
        .map(|p| {
            json!({
                "role": p.role,
                "name": p.role.display_name(),
                "synthesis": p.synthesis,
                "depends_on": p.dependencies,
                "goal": p.template.goal,
                "criteria": p.rubric.criteria,
            })
        })
        .collect();
    json!({ "roles": roles })
}

fn roles_text(registry: &RoleRegistry) -> String {
    let mut out = String::new();
    for profile in registry.profiles() {
        out.push_str(&format!(
            "{} ({})\n",
            profile.role.display_name(),
            profile.role
        ));
        if !profile.dependencies.is_empty() {
            let deps: Vec<&str> = profile.dependencies.iter().map(|r| r.as_str()).collect();
            out.push_str(&format!("  depends on: {}\n", deps.join(", ")));
        }
        out.push_str(&format!("  goal: {}\n", profile.template.goal));
        out.push_str("  reviewed for:\n");
        for criterion in &profile.rubric.criteria {
            out.push_str(&format!("    - {criterion}\n"));
        }
    }
    out.trim_end().to_string()
}
