use indicatif::{ProgressBar, ProgressStyle};
use ripecheck::lens::ripestat::{
    check_rows, format_rows, CheckArgs, CheckProgress, CheckProgressCallback, RipestatLens,
};
use ripecheck::lens::utils::OutputFormat;
use std::sync::Arc;
use std::time::Duration;

pub fn run(lens: &RipestatLens, args: CheckArgs, output_format: OutputFormat) {
    let pb = ProgressBar::new_spinner();
    pb.set_message(format!("resolving {}", args.resource));
    pb.enable_steady_tick(Duration::from_millis(100));

    let pb_for_updates = pb.clone();
    let callback: CheckProgressCallback = Arc::new(move |progress: CheckProgress| match progress {
        CheckProgress::Started { resource, asn } => {
            pb_for_updates.set_message(format!("{} is AS{}", resource, asn));
        }
        CheckProgress::Planned { total_calls } => {
            if let Ok(sty) = ProgressStyle::with_template(
                "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>3}/{len:3} {msg}",
            ) {
                pb_for_updates.set_style(sty.progress_chars("##-"));
            }
            pb_for_updates.set_length(total_calls as u64);
        }
        CheckProgress::CallFinished {
            call_type,
            resource,
            ..
        } => {
            pb_for_updates.inc(1);
            pb_for_updates.set_message(format!("{} {}", call_type, resource));
        }
        CheckProgress::Completed { .. } => pb_for_updates.finish_and_clear(),
    });

    let ctx = match lens.check_with_progress(&args, Some(callback)) {
        Ok(ctx) => ctx,
        Err(e) => {
            pb.finish_and_clear();
            eprintln!("ERROR: {}", e);
            return;
        }
    };

    for error in ctx.errors() {
        eprintln!(
            "WARNING: {} call for {} failed: {}",
            error.call_type, error.key, error.record.error
        );
    }

    let rows = check_rows(&ctx);
    if rows.is_empty() {
        eprintln!("no prefixes found for AS{}", ctx.asn);
        return;
    }
    println!("{}", format_rows(&rows, output_format));
}
