use crate::context::CliContext;
use crate::error::CliResult;
use meshroles_config::MeshConfig;
use meshroles_registry::Registry;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

// A helper to print section titles
fn print_section_title(title: &str) {
    println!("\n🩺 === {} === 🩺", title.to_uppercase());
}

// A helper to print check results
fn print_check_result(check_name: &str, success: bool, message: String) {
    let status_emoji = if success { "✅" } else { "❌" };
    let status_text = if success { "OK" } else { "FAILED" };
    println!("  [{:<7}] {}: {}", format!("{} {}", status_emoji, status_text), check_name, message);
}

async fn check_meshtastic(ctx: &CliContext) -> bool {
    print_section_title("Meshtastic CLI");
    let binary = &ctx.config.meshtastic.binary;
    let run = Command::new(binary)
        .arg("--version")
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output();
    match tokio::time::timeout(Duration::from_secs(ctx.config.meshtastic.timeout_secs), run).await {
        Ok(Ok(output)) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
            print_check_result("meshtastic CLI", true, format!("{} ({})", binary, version));
            true
        }
        Ok(Ok(output)) => {
            let err = String::from_utf8_lossy(&output.stderr).trim().to_string();
            print_check_result("meshtastic CLI", false, format!("{} exited with {}: {}", binary, output.status, err));
            false
        }
        Ok(Err(e)) => {
            print_check_result(
                "meshtastic CLI",
                false,
                format!("'{}' could not be executed. Is it installed (pip install meshtastic) and in PATH? Details: {}", binary, e),
            );
            false
        }
        Err(_) => {
            print_check_result("meshtastic CLI", false, format!("'{} --version' timed out", binary));
            false
        }
    }
}

fn check_config(ctx: &CliContext) -> bool {
    print_section_title("Configuration");
    let path = &ctx.config_path;
    let ok = if !path.exists() {
        print_check_result(
            "Config file",
            true,
            format!("{} not found; using defaults (run `meshroles config init` to create it)", path.display()),
        );
        true
    } else {
        match MeshConfig::load(path) {
            Ok(_) => {
                print_check_result("Config file", true, format!("Parsed {}", path.display()));
                true
            }
            Err(e) => {
                print_check_result("Config file", false, format!("{:#}", e));
                false
            }
        }
    };
    match &ctx.config.meshtastic.port {
        Some(port) => print_check_result("Default port", true, port.clone()),
        None => print_check_result("Default port", true, "not set; pass a port on the command line".to_string()),
    }
    ok
}

fn check_registry(ctx: &CliContext) -> bool {
    print_section_title("Registry");
    let path = &ctx.registry_path;
    match Registry::open(path) {
        Ok(registry) => {
            let findings = registry.audit(ctx.qualifiers());
            let violations = findings.iter().filter(|f| f.is_violation()).count();
            print_check_result(
                "Registry file",
                true,
                format!("{} ({} nodes)", path.display(), registry.len()),
            );
            print_check_result(
                "Registry audit",
                violations == 0,
                format!("{} violation(s), {} advisory", violations, findings.len() - violations),
            );
            violations == 0
        }
        Err(e) => {
            print_check_result("Registry file", false, e.to_string());
            false
        }
    }
}

pub async fn run_diagnostics(ctx: &CliContext) -> CliResult {
    println!("meshroles doctor: checking the field setup");

    let results = [check_meshtastic(ctx).await, check_config(ctx), check_registry(ctx)];

    let failed = results.iter().filter(|ok| !**ok).count();
    if failed == 0 {
        println!("\nAll checks passed.");
    } else {
        println!("\n{} of {} checks reported problems; see above.", failed, results.len());
    }
    Ok(())
}
