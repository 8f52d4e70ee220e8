fn main() -> anyhow::Result<()> {
    pollster::block_on(sphere_picking::run())
}
