use anyhow::Result;

fn main() -> Result<()> {
    speedsift_cli::main_entry()
}
