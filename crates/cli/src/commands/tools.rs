//! `hydra tools`: List the tools the model can call.

use hydra_tools::{IdentityPolicy, ToolName};

pub fn run() {
    println!();
    println!("  {} tools available:", ToolName::ALL.len());
    println!();
    for tool in ToolName::ALL {
        let marker = match tool.identity() {
            IdentityPolicy::Required => " (signed-in)",
            IdentityPolicy::None => "",
        };
        println!("  {:<24}{}{marker}", tool.as_str(), tool.description());
    }
    println!();
}
