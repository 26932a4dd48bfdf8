use agent_portal::portal::api::{PortalClient, DEEP_AGENT_PLANS};
use agent_portal::portal::chat::{ChatEvent, ChatSession};
use agent_portal::portal::config::PortalConfig;
use agent_portal::portal::graph::{GraphEditor, GraphLoader, NodePatch};
use agent_portal::portal::run::{
    Run, RunExecutor, RunRequest, RunWatcher, StepStatus, DEFAULT_GRAPH_GOAL,
};
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(author, version, about = "Client for the AI portal backend", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Edit a workflow graph file
    Graph {
        /// Graph file (.json, .yaml or .yml)
        #[arg(short, long, default_value = "workflow-graph.json")]
        file: PathBuf,

        #[command(subcommand)]
        action: GraphAction,
    },
    /// Execute a workflow graph and save its summary
    Run {
        /// Graph file to execute
        #[arg(short, long, default_value = "workflow-graph.json")]
        file: PathBuf,

        /// Goal for the run
        #[arg(short, long, default_value = DEFAULT_GRAPH_GOAL)]
        goal: String,

        /// Directory for agent-run-<id>.md
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Manage and run DeepAgents
    Agent {
        #[command(subcommand)]
        action: AgentAction,
    },
    /// Send one chat message and stream the reply
    Chat {
        /// The message to send
        #[arg(short, long)]
        message: String,

        /// Existing chat to continue
        #[arg(long)]
        chat_id: Option<String>,

        /// Create a new chat in this project first
        #[arg(long, conflicts_with = "chat_id")]
        project: Option<String>,

        /// Model id, e.g. openai:gpt-4o
        #[arg(long)]
        model: Option<String>,
    },
    /// List or create projects
    Projects {
        #[command(subcommand)]
        action: ProjectAction,
    },
    /// List or create chats
    Chats {
        #[command(subcommand)]
        action: ChatAction,
    },
    /// Print a chat's messages
    Messages {
        #[arg(long)]
        chat_id: String,
    },
    /// Show the current subscription plan
    Plan,
}

#[derive(Subcommand, Debug)]
enum GraphAction {
    /// Write the starter plan -> search -> analyze graph
    New,
    /// Print the graph as JSON
    Show,
    /// Add a node for a tool
    Add {
        #[arg(short, long)]
        tool: String,
    },
    /// Link two nodes
    Connect {
        #[arg(short, long)]
        source: String,
        #[arg(short, long)]
        target: String,
    },
    /// Delete a node and its edges
    Delete {
        #[arg(short, long)]
        node: String,
    },
    /// Edit a node's label, tool or JSON input
    Set {
        #[arg(short, long)]
        node: String,
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        tool: Option<String>,
        /// Input as JSON text
        #[arg(long)]
        input: Option<String>,
    },
    /// List step placeholders used in node inputs
    Refs,
    /// Export as workflow-graph.json into a directory
    Export {
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum AgentAction {
    List,
    Create {
        #[arg(short, long)]
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
        #[arg(long, default_value = "gpt-4o")]
        model: String,
    },
    /// Start a run and poll it until it finishes
    Run {
        #[arg(short, long)]
        agent: String,
        #[arg(short, long)]
        goal: String,
        /// Return right after the run is accepted
        #[arg(long)]
        no_watch: bool,
    },
    /// List runs
    Runs,
    /// Show one run
    Status {
        #[arg(short, long)]
        run: String,
    },
}

#[derive(Subcommand, Debug)]
enum ProjectAction {
    List,
    Create {
        #[arg(short, long)]
        name: String,
        #[arg(short, long, default_value = "New AI project")]
        description: String,
    },
}

#[derive(Subcommand, Debug)]
enum ChatAction {
    List {
        #[arg(short, long)]
        project: String,
    },
    Create {
        #[arg(short, long)]
        project: String,
        #[arg(short, long)]
        title: String,
        #[arg(long)]
        model: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let config = PortalConfig::from_env()?;

    match args.command {
        Commands::Graph { file, action } => edit_graph(&file, action)?,
        Commands::Run {
            file,
            goal,
            out_dir,
        } => {
            let graph = GraphLoader::new()
                .load(&file)
                .with_context(|| format!("loading {}", file.display()))?;
            let client = PortalClient::new(config)?;

            println!("Executing {} ({} nodes)", file.display(), graph.nodes.len());
            let receipt = client.submit_graph(&RunRequest::new(goal, graph)).await?;
            match receipt.summary_artifact() {
                Some(artifact) => {
                    let path = artifact.write_to(&out_dir)?;
                    println!("Summary saved to {}", path.display());
                }
                None => println!("Run {:?} returned no summary", receipt.run_id),
            }
        }
        Commands::Agent { action } => {
            let poll_interval = config.poll_interval;
            let client = PortalClient::new(config)?;
            run_agent_action(client, poll_interval, action).await?;
        }
        Commands::Chat {
            message,
            chat_id,
            project,
            model,
        } => {
            let model = model.unwrap_or_else(|| config.default_model.clone());
            let client = PortalClient::new(config)?;
            chat(&client, &message, chat_id, project, model).await?;
        }
        Commands::Projects { action } => {
            let client = PortalClient::new(config)?;
            match action {
                ProjectAction::List => {
                    for project in client.list_projects().await? {
                        println!("{}\t{}", project.id, project.name);
                    }
                }
                ProjectAction::Create { name, description } => {
                    let project = client.create_project(&name, &description).await?;
                    println!("Created project {} ({})", project.name, project.id);
                }
            }
        }
        Commands::Chats { action } => {
            let default_model = config.default_model.clone();
            let client = PortalClient::new(config)?;
            match action {
                ChatAction::List { project } => {
                    for chat in client.list_chats(&project).await? {
                        println!("{}\t{}", chat.id, chat.title.unwrap_or_default());
                    }
                }
                ChatAction::Create {
                    project,
                    title,
                    model,
                } => {
                    let model = model.unwrap_or(default_model);
                    let chat = client.create_chat(&project, &title, &model).await?;
                    println!("Created chat {}", chat.id);
                }
            }
        }
        Commands::Messages { chat_id } => {
            let client = PortalClient::new(config)?;
            for message in client.list_messages(&chat_id).await? {
                println!("[{:?}] {}", message.role, message.content);
            }
        }
        Commands::Plan => {
            let client = PortalClient::new(config)?;
            let plan = client.current_plan().await?;
            println!("Plan: {:?}", plan);
            println!("DeepAgent access: {}", plan.permits(DEEP_AGENT_PLANS));
        }
    }

    Ok(())
}

fn edit_graph(file: &Path, action: GraphAction) -> anyhow::Result<()> {
    let loader = GraphLoader::new();

    if let GraphAction::New = action {
        loader.save(&GraphEditor::starter().serialize(), file)?;
        println!("Wrote starter graph to {}", file.display());
        return Ok(());
    }

    let graph = loader
        .load(file)
        .with_context(|| format!("loading {}", file.display()))?;
    let mut editor = GraphEditor::from_graph(graph);

    match action {
        GraphAction::New => unreachable!("handled above"),
        GraphAction::Show => {
            println!("{}", editor.graph().to_json_pretty()?);
            return Ok(());
        }
        GraphAction::Refs => {
            for found in editor.graph().references() {
                let marker = if found.target_present { "" } else { " (missing)" };
                println!("{}: {}{}", found.node_id, found.reference, marker);
            }
            return Ok(());
        }
        GraphAction::Export { dir } => {
            let path = loader.export(editor.graph(), dir)?;
            println!("Exported to {}", path.display());
            return Ok(());
        }
        GraphAction::Add { tool } => {
            let id = editor.add_node(&tool).id.clone();
            println!("Added node {}", id);
        }
        GraphAction::Connect { source, target } => {
            let id = editor.connect(&source, &target).id.clone();
            println!("Added edge {}", id);
        }
        GraphAction::Delete { node } => {
            if editor.delete_node(&node).is_none() {
                bail!("node '{}' not found", node);
            }
            println!("Deleted node {}", node);
        }
        GraphAction::Set {
            node,
            label,
            tool,
            input,
        } => {
            if let Some(text) = input {
                editor.update_node_input_json(&node, &text)?;
            }
            if !editor.update_node(
                &node,
                NodePatch {
                    label,
                    tool,
                    input: None,
                },
            ) {
                bail!("node '{}' not found", node);
            }
            println!("Updated node {}", node);
        }
    }

    loader.save(editor.graph(), file)?;
    Ok(())
}

async fn run_agent_action(
    client: PortalClient,
    poll_interval: std::time::Duration,
    action: AgentAction,
) -> anyhow::Result<()> {
    match action {
        AgentAction::List => {
            for agent in client.list_agents().await? {
                println!("{}\t{}", agent.id, agent.name);
            }
        }
        AgentAction::Create {
            name,
            description,
            model,
        } => {
            let agent = client.create_agent(&name, &description, &model).await?;
            println!("Created agent {} ({})", agent.name, agent.id);
        }
        AgentAction::Runs => {
            for run in client.list_runs().await? {
                println!("{}\t{}\t{}", run.id, run.status, run.goal);
            }
        }
        AgentAction::Status { run } => match client.fetch_run(&run).await? {
            Some(run) => println!("{}", serde_json::to_string_pretty(&run)?),
            None => println!("Run {} not found", run),
        },
        AgentAction::Run {
            agent,
            goal,
            no_watch,
        } => {
            let run_id = client.start_agent_run(&agent, &goal).await?;
            println!("Started run {}", run_id);
            if no_watch {
                return Ok(());
            }

            let watcher = RunWatcher::new(Arc::new(client), poll_interval);
            let (tx, mut rx) = mpsc::channel::<Run>(16);
            let printer = tokio::spawn(async move {
                while let Some(run) = rx.recv().await {
                    let done = run
                        .steps
                        .iter()
                        .filter(|s| s.status == StepStatus::Done)
                        .count();
                    println!("{} ({}/{} steps done)", run.status, done, run.steps.len());
                }
            });

            let run = watcher.watch(&run_id, Some(tx)).await?;
            printer.await?;
            if let Some(error) = run.error {
                println!("Error: {}", error);
            }
        }
    }
    Ok(())
}

async fn chat(
    client: &PortalClient,
    message: &str,
    chat_id: Option<String>,
    project: Option<String>,
    model: String,
) -> anyhow::Result<()> {
    let mut session = match chat_id {
        Some(id) => {
            let history = client.list_messages(&id).await?;
            ChatSession::with_history(Some(id), model, history)
        }
        None => ChatSession::new(model),
    };

    if let Some(project) = project {
        let chat = client
            .create_chat(&project, "New chat", session.model())
            .await?;
        session.set_chat_id(chat.id);
    }

    let (tx, mut rx) = mpsc::channel::<ChatEvent>(64);
    let printer = tokio::spawn(async move {
        let mut printed = 0;
        while let Some(event) = rx.recv().await {
            match event {
                ChatEvent::Content(text) => {
                    if let Some(delta) = text.get(printed..) {
                        print!("{}", delta);
                        let _ = std::io::stdout().flush();
                    }
                    printed = text.len();
                }
                ChatEvent::Done => println!(),
                ChatEvent::Error(_) | ChatEvent::Started => {}
            }
        }
    });

    let result = client.send_chat(&mut session, message, Some(&tx)).await;
    drop(tx);
    printer.await?;

    if result.is_err() {
        if let Some(last) = session.last_message() {
            eprintln!("{}", last.content);
        }
    }
    result?;
    Ok(())
}
