use std::fs;
use std::iter;
use std::path::Path;
use std::process::Command;

use log::info;

use crate::error::{Result, WorkerError};
use crate::scheduler::Scheduler;

/// Submission command line: program, scheduler arguments, job script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl SubmitCommand {
    pub fn new(program: &str, scheduler_args: Vec<String>, job_script: &Path) -> SubmitCommand {
        let mut args = scheduler_args;
        args.push(job_script.display().to_string());
        SubmitCommand { program: program.to_string(), args }
    }

    /// One shell-quoted line, parseable as a submission record later
    pub fn to_line(&self) -> String {
        shell_words::join(iter::once(&self.program).chain(self.args.iter()))
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        info!("Writing submission record to {}", path.display());
        fs::write(path, format!("{}\n", self.to_line())).map_err(|err| WorkerError::io(path, err))
    }

    /// Run the command and return the job id the scheduler assigned
    pub fn run(&self, scheduler: &dyn Scheduler) -> Result<String> {
        let mut command = Command::new(&self.program);
        let cmd = command.args(&self.args);
        info!("Running {} process", self.program);
        info!("{:?}", &cmd);

        let output = cmd
            .output()
            .map_err(|err| WorkerError::Submission(format!("can't run {}: {}", self.program, err)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(WorkerError::Submission(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let job_id = scheduler.parse_job_id(&stdout)?;
        info!("{} job id: {job_id}", scheduler.kind());
        Ok(job_id)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::merge::read_submit_record;
    use crate::scheduler::SchedulerKind;

    fn command(program: &str, args: &[&str]) -> SubmitCommand {
        SubmitCommand { program: program.to_string(), args: args.iter().map(|a| a.to_string()).collect() }
    }

    #[test]
    fn record_round_trips_through_shell_quoting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("submit.sh");
        let cmd = SubmitCommand::new(
            "qsub",
            vec!["-N".to_string(), "my job".to_string(), "-l".to_string(), "walltime=1:00:00".to_string()],
            &PathBuf::from("/scratch/worker_x/jobscript.sh"),
        );
        cmd.write(&path).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "qsub -N 'my job' -l walltime=1:00:00 /scratch/worker_x/jobscript.sh\n");
        assert_eq!(read_submit_record(&path).unwrap(), cmd.args);
    }

    #[test]
    fn job_id_is_parsed_from_stdout() {
        let pbs = command("echo", &["4242.master"]);
        assert_eq!(pbs.run(SchedulerKind::PbsTorque.scheduler()).unwrap(), "4242.master");
        let slurm = command("echo", &["Submitted batch job 77"]);
        assert_eq!(slurm.run(SchedulerKind::Slurm.scheduler()).unwrap(), "77");
    }

    #[test]
    fn failing_command_reports_stderr() {
        let cmd = command("sh", &["-c", "echo 'qsub: Unknown queue' >&2; exit 3"]);
        let err = cmd.run(SchedulerKind::PbsTorque.scheduler()).unwrap_err();
        assert!(matches!(err, WorkerError::Submission(msg) if msg.contains("Unknown queue")));
    }

    #[test]
    fn missing_program_is_submission_error() {
        let cmd = command("/nonexistent/qsub", &[]);
        assert!(matches!(cmd.run(SchedulerKind::PbsTorque.scheduler()), Err(WorkerError::Submission(_))));
    }
}
