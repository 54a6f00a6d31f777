//! Print the cosmic history of the standard epoch table.
//!
//! Usage: `timeline [H0 OMEGA_M]` for a flat ΛCDM background, otherwise the
//! default parameters.

use cosmos_core::{CosmologyParams, EpochTable, SECONDS_PER_YEAR};
use cosmos_physics::CosmologyEngine;

fn parse_params() -> Result<CosmologyParams, String> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let params = match args.as_slice() {
        [] => CosmologyParams::default(),
        [h0, omega_m] => {
            let h0: f64 = h0.parse().map_err(|e| format!("bad H0 {h0:?}: {e}"))?;
            let omega_m: f64 = omega_m
                .parse()
                .map_err(|e| format!("bad Omega_m {omega_m:?}: {e}"))?;
            CosmologyParams::flat_lcdm(h0, omega_m)
        }
        _ => return Err("usage: timeline [H0 OMEGA_M]".to_string()),
    };
    params.validate().map_err(|e| e.to_string())?;
    Ok(params)
}

fn main() {
    let params = match parse_params() {
        Ok(params) => params,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };

    eprintln!(
        "H0 = {} km/s/Mpc, Omega_m = {}, Omega_Lambda = {}, Omega_r = {}",
        params.h0, params.omega_m, params.omega_lambda, params.omega_r
    );

    let mut engine = CosmologyEngine::new(params, EpochTable::standard());
    println!(
        "{:<26} {:>11} {:>11} {:>11} {:>11} {:>11} {:>11}  {}",
        "epoch", "t [s]", "t [yr]", "a", "z", "T [K]", "H [km/s/Mpc]", "stage"
    );

    for index in 0..engine.epochs().len() {
        let Some(snap) = engine.jump_to_epoch(index) else {
            break;
        };
        let name = engine
            .epochs()
            .get(index)
            .map_or(String::new(), |e| e.name.clone());
        println!(
            "{:<26} {:>11.3e} {:>11.3e} {:>11.3e} {:>11.3e} {:>11.3e} {:>11.3e}  {}",
            name,
            snap.time,
            snap.time / SECONDS_PER_YEAR,
            snap.scale_factor,
            snap.redshift,
            snap.temperature,
            snap.hubble,
            snap.stage.name()
        );
    }

    let today = engine.jump_to_time(cosmos_core::AGE_OF_UNIVERSE);
    let fractions = engine.density_fractions();
    println!();
    println!(
        "Today: a = {:.6}, T = {:.4} K, H = {:.3} km/s/Mpc",
        today.scale_factor, today.temperature, today.hubble
    );
    println!(
        "  matter {:.3}, radiation {:.2e}, curvature {:.3}, dark energy {:.3}",
        fractions.matter, fractions.radiation, fractions.curvature, fractions.dark_energy
    );
}
