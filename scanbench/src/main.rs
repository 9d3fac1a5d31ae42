fn main() -> anyhow::Result<()> {
    scanbench::run()
}
