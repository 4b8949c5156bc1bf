use rolodex_core::config::StoreBackend;
use rolodex_db::{customer_repository, DemoDataset, SeedResult};

use crate::commands::{load_config, runtime, CommandResult};

pub fn run() -> CommandResult {
    let config = match load_config("seed") {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let repository = match customer_repository(&config.store) {
        Ok(repository) => repository,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "store_credentials",
                format!("store is not usable: {error}"),
                4,
            );
        }
    };

    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(message) => return CommandResult::failure("seed", "runtime_init", message, 3),
    };

    let result = runtime.block_on(async {
        let seeded = DemoDataset::load(&repository)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = DemoDataset::verify(&repository).await;
        if !verification.all_present {
            return Err(("seed_verification", verification_message(&verification.checks), 6u8));
        }
        Ok(seeded)
    });

    match result {
        Ok(seeded) => {
            let mut message = summary(&seeded);
            if config.store.backend == StoreBackend::Memory {
                message.push_str("\nnote: memory backend in use; records are discarded on exit");
            }
            CommandResult::success("seed", message)
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn summary(seeded: &SeedResult) -> String {
    let mut lines = vec![format!(
        "demo customers: {} created, {} already present",
        seeded.created.len(),
        seeded.skipped.len()
    )];
    lines.extend(seeded.created.iter().map(|customer| {
        format!("  - created {} ({})", customer.email, customer.id)
    }));
    lines.extend(seeded.skipped.iter().map(|email| format!("  - kept {email}")));
    lines.join("\n")
}

fn verification_message(checks: &[(&'static str, bool)]) -> String {
    let missing =
        checks.iter().filter_map(|(email, present)| (!present).then_some(*email)).collect::<Vec<_>>();
    if missing.is_empty() {
        "some demo customers could not be found after seeding".to_string()
    } else {
        format!("demo customers not searchable after seeding: {}", missing.join(", "))
    }
}
