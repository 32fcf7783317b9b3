pub mod address;
pub mod config;
pub mod error;
pub mod lru;
pub mod simulation;
pub mod simulation_result;
pub mod store;
pub mod trace;

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
use wasm_bindgen::prelude::*;

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
#[wasm_bindgen]
pub fn run_simulation(trace: &str, set_index_bits: u32, num_lines: usize, offset_bits: u32) -> String {
    use config::CacheConfig;
    use simulation::Simulator;

    let config = match CacheConfig::new(set_index_bits, num_lines, offset_bits) {
        Ok(config) => config,
        Err(e) => return format!("invalid cache configuration: {e}"),
    };

    let mut simulator = match Simulator::new(config) {
        Ok(simulator) => simulator,
        Err(e) => return format!("invalid cache configuration: {e}"),
    };

    let trace = match trace::Trace::try_from(trace) {
        Ok(trace) => trace,
        Err(e) => return format!("failed to parse trace: {e}"),
    };

    let mut result = vec![simulator.config().format_info()];
    match simulator.run(trace.accesses()) {
        Ok(simulation_result) => result.push(simulation_result.format_summary()),
        Err(e) => return format!("simulation aborted: {e}"),
    };

    result.join("\n")
}
