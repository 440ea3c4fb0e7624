//! Payment scope auditor
//!
//! The payment provider is observed only through its configuration in the
//! environment. This auditor never proposes mutations.

use ops_core::{
    Change, ChangeAction, ChangeType, EnvironmentSource, PaymentSpec, Scope, Severity,
};
use serde_json::json;

use super::is_set;

const KEY_PREFIXES: [&str; 2] = ["sk_", "rk_"];

pub fn audit(spec: &PaymentSpec, env: &dyn EnvironmentSource) -> Vec<Change> {
    let secret = env.var(&spec.secret_var);
    let Some(secret) = secret.filter(|v| is_set(Some(v.as_str()))) else {
        // Without a secret nothing else can be checked meaningfully.
        return vec![verify(
            &spec.secret_var,
            ChangeType::VerifyStripe,
            Severity::Medium,
            format!("Payment secret {} is not configured", spec.secret_var),
        )];
    };

    let mut changes = Vec::new();

    if !KEY_PREFIXES.iter().any(|p| secret.trim().starts_with(p)) {
        changes.push(
            verify(
                &spec.secret_var,
                ChangeType::VerifyStripe,
                Severity::Medium,
                format!("{} does not look like a Stripe secret key", spec.secret_var),
            )
            .with_current(json!({ "recognized_prefix": false })),
        );
    }

    for price in &spec.price_vars {
        if !is_set(env.var(price).as_deref()) {
            changes.push(verify(
                price,
                ChangeType::VerifyPrice,
                Severity::Low,
                format!("Price identifier {price} is not configured"),
            ));
        }
    }

    if let Some(webhook) = &spec.webhook_secret_var {
        if !is_set(env.var(webhook).as_deref()) {
            changes.push(verify(
                webhook,
                ChangeType::VerifyStripe,
                Severity::Low,
                format!("Webhook signing secret {webhook} is not configured"),
            ));
        }
    }

    changes
}

fn verify(name: &str, change_type: ChangeType, severity: Severity, description: String) -> Change {
    Change::new(
        Scope::Payment,
        change_type,
        name,
        severity,
        ChangeAction::Verify,
        description,
    )
    .with_desired(json!({ "name": name }))
}
