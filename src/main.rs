/*
 * File: /main.rs
 * Created Date: Tuesday November 21st 2023
 * Author: Zihan
 * -----
 * Last Modified: Saturday, 17th October 2026 5:10:40 pm
 * Modified By: the developer formerly known as Zihan at <wzh4464@gmail.com>
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2026-10-17		Zihan	Run the consensus ensemble on a .npy matrix
 */

use std::error::Error;
use std::fs::File;
use std::time::Instant;

use chrono::Local;
use log::{info, LevelFilter};
use ndarray::Array2;
use ndarray_npy::ReadNpyExt;

use consensus_ensemble::config::CliArgs;
use consensus_ensemble::{ConsensusEnsemble, DataMatrix};

fn timestamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

fn main() -> Result<(), Box<dyn Error>> {
    simple_logger::SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .init()?;

    let args = CliArgs::new(std::env::args())?;
    let config = args.load_config()?;

    let load_start = Instant::now();
    let data = Array2::<f64>::read_npy(File::open(&args.data_path)?)?;
    info!(
        "[{}] Loaded {}x{} matrix from {} in {}ms",
        timestamp(),
        data.nrows(),
        data.ncols(),
        args.data_path.display(),
        load_start.elapsed().as_millis()
    );

    let ensemble = ConsensusEnsemble::new(config)?;
    let output = ensemble.run(&DataMatrix::new(data)?)?;

    let (n, r, v, k) = output.ensemble.shape();
    info!(
        "[{}] Ensemble: {} samples x {} repetitions x {} variants x {} k",
        timestamp(),
        n,
        r,
        v,
        k
    );
    info!("[{}] Variants: {}", timestamp(), output.ensemble.dims().variants.join(", "));
    if !output.warnings.is_empty() {
        info!("[{}] {} cells failed and were left missing", timestamp(), output.warnings.len());
    }
    Ok(())
}
