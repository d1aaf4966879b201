//! Mock Round Trip - Page Objects Against the In-Memory Pair
//!
//! Drives the full verification loop without a browser or a server: a
//! staged [`MockConsole`] plays the console, a [`ModelTree`] plays the
//! management backend, and the resource verifier closes the loop between
//! them.
//!
//! # Running
//!
//! ```bash
//! cargo run --example mock_round_trip -p verificar
//! ```

use serde_json::json;
use verificar::{
    AddressTemplate, ConfigFragment, ConsoleConfig, DefaultContext, MockConsole,
    MockManagementClient, ModelTree, Operation, Selector, TestContext, VerificarResult,
};

fn main() -> VerificarResult<()> {
    println!("=== Verificar Mock Round Trip ===\n");

    // The management backend with one seeded file handler
    let tree = ModelTree::new();
    tree.seed("/subsystem=logging", &[]);
    let address = AddressTemplate::of("/subsystem=logging/file-handler=*")?
        .resolve(&DefaultContext::new(), &["audit"])?;
    tree.seed(
        &address.to_string(),
        &[("level", json!("ALL")), ("append", json!(true))],
    );
    println!("Seeded {address}");

    // The console with an editable config region wired to the backend
    let region = Selector::css("[data-config=\"file-handler\"]");
    let mut console = MockConsole::new();
    let form = console.stage_editable_form(&region, &[("level", "ALL")]);
    let backend = tree.clone();
    let target = address.clone();
    console.on_save(&form, move |values| {
        values.iter().all(|(name, value)| {
            backend
                .apply(&Operation::write_attribute(
                    target.clone(),
                    name.as_str(),
                    value.as_str(),
                ))
                .is_success()
        })
    });

    let mut context = TestContext::builder()
        .client(MockManagementClient::new(&tree))
        .console(console)
        .console_config(ConsoleConfig::immediate())
        .build()?;

    // Edit the level through the page objects
    let timings = context.console_config();
    let mut fragment =
        ConfigFragment::bind_with_config(context.console(), region.clone(), timings)?;
    fragment.edit()?.select("level", "DEBUG")?;
    println!("Save accepted: {}", fragment.save()?);

    // Verify through the management client
    context
        .verifier()
        .verify_attribute(&address, "level", "DEBUG")?;
    println!("Backend converged on level=DEBUG");

    context.close()?;
    println!("\n=== Round Trip Complete ===");
    Ok(())
}
