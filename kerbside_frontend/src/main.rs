fn main() -> Result<(), eframe::Error> {
    kerbside_frontend::run_frontend()
}
