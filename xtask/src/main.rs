/// Bundling entry point. nih_plug_xtask does the packaging work:
///
///   cargo xtask bundle audio-delay --release
///
/// builds the cdylib and lays out `target/bundled/Audio Delay.vst3` and
/// `target/bundled/Audio Delay.clap`.
fn main() -> nih_plug_xtask::Result<()> {
    nih_plug_xtask::main()
}
