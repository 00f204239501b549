use std::collections::BTreeSet;
use std::path::Path;

use log::{info, warn};

use crate::config::Config;
use crate::error::{Result, WorkerError};
use crate::job::record::JobRecord;
use crate::job::JobDirectory;
use crate::merge::{self, Merged};
use crate::report::parse::LogParser;
use crate::report::LogReport;
use crate::workfile;
use crate::workflow::{report_outcome, stage_and_submit, working_dir, Outcome};

/// `worker resubmit`: submit the work items of the job in `--dir` that did not succeed
pub fn run(config: &Config, args: &[String]) -> Result<()> {
    match resubmit_in(&working_dir()?, config, args)? {
        Some(outcome) => report_outcome(&outcome),
        None => println!("nothing to resubmit, every work item completed"),
    }
    Ok(())
}

/// `None` when no work item needs to run again
pub fn resubmit_in(base: &Path, config: &Config, args: &[String]) -> Result<Option<Outcome>> {
    let scheduler = config.scheduler();
    let Merged { options, script } = merge::resubmit(scheduler, args)?;
    let dir = options
        .worker
        .dir
        .clone()
        .ok_or_else(|| WorkerError::SchedulerOption("the previous job directory must be given with --dir".to_string()))?;
    let previous = JobDirectory::existing(&dir)?;

    let mut config = config.clone();
    if let Some(record) = JobRecord::read(&previous.job_record())? {
        if record.scheduler != config.scheduler {
            warn!("{} was submitted to {}, resubmitting to {}", dir.display(), record.scheduler, config.scheduler);
        }
        config.separator = record.separator;
    }

    let previous_workfile = previous.require(previous.workfile())?;
    let item_count = workfile::read_blocks(&previous_workfile, &config.separator)?.len();
    let report = LogParser::new().parse(&previous.log())?;
    let keep = select_items(report.as_ref(), item_count, options.worker.redo);
    if keep.is_empty() {
        info!("All {item_count} work items of {} completed", dir.display());
        return Ok(None);
    }
    info!("Resubmitting {} of {item_count} work items", keep.len());

    stage_and_submit(base, &config, scheduler, &options, &script, |path| {
        workfile::filter(&previous_workfile, path, &config.separator, &keep)
    })
    .map(Some)
}

/// Work item numbers that have to run again
///
/// Without a report nothing has run yet, so everything is selected. Otherwise every item that did
/// not succeed is selected, failed ones only when `redo` is set.
pub fn select_items(report: Option<&LogReport>, item_count: usize, redo: bool) -> BTreeSet<usize> {
    let all = 1..=item_count;
    let Some(report) = report else {
        return all.collect();
    };

    let mut done: BTreeSet<u64> = report.successes().into_iter().collect();
    if !redo {
        done.extend(report.failures());
    }
    all.filter(|&item| !done.contains(&(item as u64))).collect()
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::*;
    use crate::merge::read_submit_record;
    use crate::workflow::submit::submit_in;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|a| a.to_string()).collect()
    }

    static LOG: &str = "\
2024-03-01 10:00:00.0 [info] : workitem 1 started : c1
2024-03-01 10:00:05.0 [info] : workitem 1 done : 0
2024-03-01 10:00:00.0 [info] : workitem 2 started : c1
2024-03-01 10:00:05.0 [info] : workitem 2 done : 1
2024-03-01 10:00:06.0 [info] : workitem 3 started : c2
";

    fn report() -> LogReport {
        LogParser::new().parse_reader(LOG.as_bytes()).unwrap().unwrap()
    }

    #[test]
    fn selection_follows_redo() {
        let report = report();
        assert_eq!(select_items(Some(&report), 4, false), [3, 4].into_iter().collect());
        assert_eq!(select_items(Some(&report), 4, true), [2, 3, 4].into_iter().collect());
        assert_eq!(select_items(None, 3, false), [1, 2, 3].into_iter().collect());
        assert!(select_items(Some(&report), 1, false).is_empty());
    }

    /// Dry-run submit of four PBS items, with a log showing item 1 succeeded and item 2 failed
    fn previous_job(base: &Path) -> PathBuf {
        let batch = base.join("job.pbs");
        fs::write(&batch, "#!/bin/bash -l\n#PBS -N sweep\n#PBS -l nodes=2,walltime=01:00:00\necho $PBS_ARRAYID\n")
            .unwrap();
        let args = strings(&["--batch", batch.to_str().unwrap(), "-t", "1-4", "-q", "short", "--port", "9000", "--dryrun"]);
        let outcome = submit_in(base, &Config::default(), &args).unwrap();
        fs::write(outcome.job.log(), LOG).unwrap();
        outcome.job.path
    }

    #[test]
    fn resubmits_unfinished_items_with_merged_options() {
        let dir = tempfile::tempdir().unwrap();
        let previous = previous_job(dir.path());
        let args = strings(&["--dir", previous.to_str().unwrap(), "-l", "walltime=02:00:00", "--dryrun"]);

        let outcome = resubmit_in(dir.path(), &Config::default(), &args).unwrap().unwrap();
        assert_eq!(outcome.item_count, 2);
        assert_ne!(outcome.job.path, previous);

        let blocks = workfile::read_blocks(&outcome.job.workfile(), "#WORKER----").unwrap();
        assert!(blocks[0].starts_with("export PBS_ARRAYID='3'"));
        assert!(blocks[1].starts_with("export PBS_ARRAYID='4'"));

        let args = read_submit_record(&outcome.job.submit_record()).unwrap();
        assert_eq!(
            args,
            strings(&[
                "-q",
                "short",
                "-l",
                "nodes=2,walltime=02:00:00",
                "-N",
                "sweep",
                "-t",
                "1-2",
                outcome.job.job_script().to_str().unwrap()
            ])
        );
        let jobscript = fs::read_to_string(outcome.job.job_script()).unwrap();
        assert!(jobscript.contains("export WORKER_PORT=9000"));
    }

    #[test]
    fn custom_directive_prefix_survives_resubmission() {
        let dir = tempfile::tempdir().unwrap();
        let batch = dir.path().join("job.pbs");
        fs::write(&batch, "#!/bin/bash\n#MY -q short\n#MY -l walltime=05:00:00\necho $PBS_ARRAYID\n").unwrap();
        let args = strings(&["--batch", batch.to_str().unwrap(), "-C", "#MY", "-t", "1-3", "--dryrun"]);
        let first = submit_in(dir.path(), &Config::default(), &args).unwrap();
        let recorded = read_submit_record(&first.job.submit_record()).unwrap();
        assert_eq!(recorded[..2].to_vec(), strings(&["-C", "#MY"]));
        assert!(recorded.contains(&"walltime=05:00:00".to_string()));
        fs::write(first.job.log(), LOG).unwrap();

        let args = strings(&["--dir", first.job.path.to_str().unwrap(), "--dryrun"]);
        let outcome = resubmit_in(dir.path(), &Config::default(), &args).unwrap().unwrap();
        assert_eq!(outcome.item_count, 1);
        let jobscript = fs::read_to_string(outcome.job.job_script()).unwrap();
        assert!(jobscript.starts_with("#!/bin/bash\n#MY -q short\n#MY -l walltime=05:00:00\n"));
        let recorded = read_submit_record(&outcome.job.submit_record()).unwrap();
        assert_eq!(
            recorded,
            strings(&[
                "-C",
                "#MY",
                "-q",
                "short",
                "-l",
                "walltime=05:00:00",
                "-t",
                "1-1",
                outcome.job.job_script().to_str().unwrap()
            ])
        );
    }

    #[test]
    fn redo_includes_failures() {
        let dir = tempfile::tempdir().unwrap();
        let previous = previous_job(dir.path());
        let args = strings(&["--dir", previous.to_str().unwrap(), "--redo", "--dryrun"]);
        let outcome = resubmit_in(dir.path(), &Config::default(), &args).unwrap().unwrap();
        assert_eq!(outcome.item_count, 3);
    }

    #[test]
    fn nothing_left_means_no_submission() {
        let dir = tempfile::tempdir().unwrap();
        let previous = previous_job(dir.path());
        let log: String = (1..=4)
            .map(|i| {
                format!(
                    "2024-03-01 10:00:00.0 [info] : workitem {i} started : c1\n2024-03-01 10:00:01.0 [info] : workitem {i} done : 0\n"
                )
            })
            .collect();
        fs::write(previous.join("server.log"), log).unwrap();

        let args = strings(&["--dir", previous.to_str().unwrap()]);
        assert!(resubmit_in(dir.path(), &Config::default(), &args).unwrap().is_none());
    }

    #[test]
    fn missing_directory_or_log() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("worker_gone");
        let args = strings(&["--dir", missing.to_str().unwrap()]);
        assert!(matches!(resubmit_in(dir.path(), &Config::default(), &args), Err(WorkerError::WorkerDirectory(_))));

        let previous = previous_job(dir.path());
        fs::remove_file(previous.join("server.log")).unwrap();
        let args = strings(&["--dir", previous.to_str().unwrap()]);
        assert!(matches!(resubmit_in(dir.path(), &Config::default(), &args), Err(WorkerError::LogFile(_))));
    }
}
