use super::{EXIT_SIGINT, exit_interrupted, wait_worker};
use crate::terminal::TerminalConsole;
use colored::Colorize;
use deployhelp_core::{DeployError, Interrupt, Quickstart, QuickstartOptions};

pub async fn handle(
    silent: bool,
    name: Option<String>,
    deploy_dir: Option<String>,
) -> anyhow::Result<()> {
    let options = QuickstartOptions {
        project_root: std::env::current_dir()?,
        silent,
        project_name: name,
        deploy_dir,
    };

    let interrupt = Interrupt::new();
    let worker = tokio::task::spawn_blocking({
        let interrupt = interrupt.clone();
        move || {
            let mut console = TerminalConsole::new(options.silent);
            Quickstart::new(&mut console)
                .with_interrupt(interrupt)
                .run(&options)
        }
    });

    let result = wait_worker(silent, &interrupt, worker).await?;

    match result {
        Ok(scaffold) => {
            if !silent {
                println!();
                println!("{}", "次のコマンドでデプロイできます:".bold());
                println!(
                    "  {} deploy --deploydir {}",
                    "deployhelp".cyan(),
                    scaffold.deploy_dir.display()
                );
            }
            Ok(())
        }
        Err(DeployError::Interrupted) => exit_interrupted(silent, "Ctrl-C", EXIT_SIGINT),
        Err(e) => exit_interrupted(silent, &e.to_string(), 1),
    }
}
