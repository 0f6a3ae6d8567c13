//! WASM bindings for Boussinesq Core.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { WasmAquiferSim } from 'boussinesq_core';
//!
//! await init();
//!
//! const heads = new Float64Array([12, 10, 8]);
//! const sim = WasmAquiferSim.chain(heads, 0.0, 1.0, 1.0, 1.0, 1.0, 10.0);
//! sim.run();
//! console.log(sim.heads());
//! ```

use wasm_bindgen::prelude::*;

use crate::mesh::{CellProperties, EdgeProperties, Mesh};
use crate::solver::{NewtonConfig, NewtonDriver};

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

/// WASM-compatible aquifer simulation on a chain of cells.
#[wasm_bindgen]
pub struct WasmAquiferSim {
    driver: NewtonDriver,
}

#[wasm_bindgen]
impl WasmAquiferSim {
    /// Create a simulation on a chain of cells with the given initial heads.
    ///
    /// # Arguments
    /// * `heads` - Initial head per cell
    /// * `bottom` - Bedrock elevation of every cell
    /// * `area` - Plan area of every cell
    /// * `spacing` - Distance between neighboring cell centers
    /// * `conductivity` - Saturated hydraulic conductivity
    /// * `delta_t` - Time step
    /// * `sim_time` - Total simulated time
    #[wasm_bindgen]
    pub fn chain(
        heads: &[f64],
        bottom: f64,
        area: f64,
        spacing: f64,
        conductivity: f64,
        delta_t: f64,
        sim_time: f64,
    ) -> Result<WasmAquiferSim, JsValue> {
        let cells = heads.iter().map(|&h| CellProperties::new(h, bottom, area));
        // Rectangular cells: shared edge length is area over spacing
        let edge = EdgeProperties::new(spacing, conductivity, area / spacing);
        let mesh = Mesh::chain(cells, edge).map_err(|e| JsValue::from_str(&e.to_string()))?;

        let config = NewtonConfig::new()
            .with_delta_t(delta_t)
            .with_sim_time(sim_time);
        let driver = NewtonDriver::new(mesh, config).map_err(|e| JsValue::from_str(&e.to_string()))?;

        Ok(WasmAquiferSim { driver })
    }

    /// Advance one time step, returning the final `max|R|`.
    #[wasm_bindgen]
    pub fn step(&mut self) -> Result<f64, JsValue> {
        self.driver
            .step()
            .map(|report| report.max_residual)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Run until the configured simulated time, returning the step count.
    #[wasm_bindgen]
    pub fn run(&mut self) -> Result<usize, JsValue> {
        self.driver
            .run()
            .map(|summary| summary.steps.len())
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Current head per cell.
    #[wasm_bindgen]
    pub fn heads(&self) -> Vec<f64> {
        self.driver.heads().to_vec()
    }

    /// Simulated time reached so far.
    #[wasm_bindgen(getter)]
    pub fn time(&self) -> f64 {
        self.driver.time()
    }
}

/// Get the library version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
