use anyhow::Result;

fn main() -> Result<()> {
    apispec_cli::main_entry()
}
