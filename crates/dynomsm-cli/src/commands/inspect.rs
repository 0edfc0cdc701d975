use crate::cli::InspectArgs;
use crate::error::Result;
use crate::utils::loader;

pub fn run(args: InspectArgs) -> Result<()> {
    let loaded = loader::load_trajectory(&args.input)?;
    let trajectory = &loaded.trajectory;

    println!("Trajectory: {}", args.input.display());
    if let Some(name) = &loaded.name {
        println!("  Name:     {}", name);
    }
    println!("  Frames:   {}", trajectory.len());
    println!("  Features: {}", trajectory.dim());

    if trajectory.is_empty() || trajectory.dim() == 0 {
        return Ok(());
    }

    println!();
    println!("  {:<24} {:>10} {:>10} {:>10}", "feature", "min", "mean", "max");
    let data = trajectory.to_matrix();
    for col in 0..trajectory.dim() {
        let column = data.column(col);
        let min = column.min();
        let max = column.max();
        let mean = column.sum() / trajectory.len() as f64;
        let label = loaded
            .feature_names
            .get(col)
            .cloned()
            .unwrap_or_else(|| format!("feature_{col}"));
        println!("  {label:<24} {min:>10.4} {mean:>10.4} {max:>10.4}");
    }
    Ok(())
}
