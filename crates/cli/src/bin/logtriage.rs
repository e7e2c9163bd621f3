use anyhow::Result;

fn main() -> Result<()> {
    logtriage_cli::main_entry()
}
