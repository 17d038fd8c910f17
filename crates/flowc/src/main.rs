fn main() {
    flowc::tracing_setup::init();
    let args: Vec<String> = std::env::args().skip(1).collect();
    std::process::exit(flowc::run(&args));
}
