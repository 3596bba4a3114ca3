use std::{
    io::{self, BufRead},
    thread::{self, JoinHandle},
};

use process_log_system::{Logger, OutputLine, Pipeline, ProcessRunner, RunError, TaskId};

const HELP: &str = "commands: run <cmd> [| <cmd> ...], start <label>, finish <id> [message], \
fail <id> [message], tasks, level <name>, env <name>, \
show <file|date|env|level> <on|off>, sep, exit";

pub fn run_cli(logger: &Logger) {
    logger.info("Process runner started. Enter a command or 'exit' to quit.");
    logger.info(HELP);

    let runner = ProcessRunner::with_logger(logger.clone());
    let mut jobs: Vec<JoinHandle<()>> = Vec::new();

    for input in io::stdin().lock().lines() {
        let input = match input {
            Ok(input) => input,
            Err(e) => {
                logger.error(format!("Failed to read input: {}", e));
                break;
            }
        };
        let mut args = input.split_whitespace();
        let command = args.next();

        match command {
            Some("run") => {
                let rest: Vec<&str> = args.collect();
                match parse_pipeline(&rest) {
                    Some(pipeline) => {
                        jobs.push(spawn_job(logger, &runner, rest.join(" "), pipeline))
                    }
                    None => logger.warn("Command to execute must be specified."),
                }
            }
            Some("start") => {
                let label: Vec<&str> = args.collect();
                if label.is_empty() {
                    logger.warn("Task label must be specified.");
                } else {
                    let id = logger.start_task(label.join(" "));
                    logger.info(format!("Started task with ID: {}", id));
                }
            }
            Some(verb @ ("finish" | "fail")) => match args.next() {
                Some(id) => {
                    let message: Vec<&str> = args.collect();
                    let message = message.join(" ");
                    let message = (!message.is_empty()).then_some(message.as_str());
                    if !logger.finish_task(&TaskId::from(id), message, verb == "finish") {
                        logger.warn(format!("Task {} is not running", id));
                    }
                }
                None => logger.warn("Task ID must be specified."),
            },
            Some("tasks") => {
                let tasks = logger.tracker().active();
                if tasks.is_empty() {
                    logger.info("No active tasks");
                }
                for task in tasks {
                    logger.info(format!("{}\t{}", task.id, task.label));
                }
            }
            Some("level") => match args.next().map(|name| logger.set_level(name)) {
                Some(Ok(())) => {}
                Some(Err(e)) => logger.error(e),
                None => logger.warn("Level name must be specified."),
            },
            Some("env") => match args.next() {
                Some(name) => logger.set_env(name),
                None => logger.warn("Environment name must be specified."),
            },
            Some("show") => match (args.next(), args.next().map(|flag| flag == "on")) {
                (Some("file"), Some(show)) => logger.show_file(show),
                (Some("date"), Some(show)) => logger.show_date(show),
                (Some("env"), Some(show)) => logger.show_env(show),
                (Some("level"), Some(show)) => logger.show_level(show),
                _ => logger.warn("Usage: show <file|date|env|level> <on|off>"),
            },
            Some("sep") => logger.sep(),
            Some("help") => logger.info(HELP),
            Some("exit") => {
                logger.info("Exiting the program...");
                break;
            }
            Some(cmd) => logger.warn(format!("Unknown command: {}. Please try again.", cmd)),
            None => continue,
        }
    }

    for job in jobs {
        if job.join().is_err() {
            logger.error("A pipeline job panicked");
        }
    }
}

/// Split `a b | c d` into stages at standalone `|` tokens.
fn parse_pipeline(tokens: &[&str]) -> Option<Pipeline> {
    let mut pipeline = Pipeline::new().show_output(true).title(tokens.join(" "));
    for stage in tokens.split(|token| *token == "|") {
        if stage.is_empty() {
            return None;
        }
        pipeline = pipeline.stage(stage.iter().copied());
    }
    (!pipeline.stages().is_empty()).then_some(pipeline)
}

fn spawn_job(
    logger: &Logger,
    runner: &ProcessRunner,
    title: String,
    pipeline: Pipeline,
) -> JoinHandle<()> {
    let logger = logger.clone();
    let runner = runner.clone();
    thread::spawn(move || {
        let task = logger.start_task(&title);
        let outcome = runner.run_with(
            &pipeline,
            |line| matches!(line, OutputLine::Stderr(_)),
            |stdout: &str, _stderr: &str| stdout.lines().count(),
        );
        match outcome {
            Ok(result) => {
                let errors = result.line_outputs.iter().filter(|is_err| **is_err).count();
                let summary = format!(
                    "exit {}, {} lines, {} on stderr",
                    result.code,
                    result.completion_output.unwrap_or_default(),
                    errors
                );
                logger.finish_task(&task, Some(&summary), result.success);
            }
            Err(RunError::Launch { program, source }) => {
                logger.error(format!("Could not launch {}: {}", program, source));
                logger.finish_task(&task, Some("launch failed"), false);
            }
            Err(e) => {
                logger.error(&e);
                logger.finish_task(&task, None, false);
            }
        }
    })
}
