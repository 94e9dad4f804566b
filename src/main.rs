//! 程序入口：初始化日志，按子命令驱动查看器核心
//!
//! 以命令行代替编辑器：读入源码与解析器输出，模拟光标移动或点击，
//! 把产生的视图指令逐行以 JSON 输出。

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::fmt::SubscriberBuilder;

use php_ast_viewer::model::performance::run_performance_suite;
use php_ast_viewer::utils::clipboard::copy_node;
use php_ast_viewer::vm::bridge::{STATUS_COPIED, STATUS_PARSED, STATUS_READY};
use php_ast_viewer::{NodeClick, NodePath, ViewCommand, ViewerConfig, ViewerState};

#[derive(Parser)]
#[command(name = "php_ast_viewer")]
#[command(about = "Navigate a PHP-Parser AST by source position", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 配置文件（JSON）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 输出调试日志
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Args)]
struct Input {
    /// 解析器输出（节点数组或 {"result": ...} 包装）
    #[arg(long)]
    ast: PathBuf,

    /// PHP 源码
    #[arg(long)]
    source: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// 按光标位置选中最小节点
    Locate {
        #[command(flatten)]
        input: Input,

        /// 字节偏移
        #[arg(long, conflicts_with_all = ["line", "column"])]
        offset: Option<usize>,

        /// 行号（从 1 开始）
        #[arg(long, requires = "column")]
        line: Option<usize>,

        /// 列号（从 1 开始）
        #[arg(long, requires = "line")]
        column: Option<usize>,

        /// 复制选中节点到剪贴板
        #[arg(long)]
        copy: bool,
    },

    /// 按结构路径或 JSONPath 选中节点
    Resolve {
        #[command(flatten)]
        input: Input,

        /// 结构路径，如 root.0.stmts.1
        #[arg(long, conflicts_with = "json_path")]
        path: Option<String>,

        /// JSONPath，如 $[0].stmts[1]
        #[arg(long)]
        json_path: Option<String>,
    },

    /// 打印树视图的可见行
    Tree {
        #[command(flatten)]
        input: Input,

        /// 先选中该路径（展开其祖先）
        #[arg(long)]
        path: Option<String>,
    },

    /// 打印 JSON 视图的可见行
    Json {
        #[command(flatten)]
        input: Input,

        /// 先选中该路径
        #[arg(long)]
        path: Option<String>,
    },

    /// 运行性能测试
    Bench,

    /// 写出默认配置
    InitConfig {
        /// 输出路径
        #[arg(default_value = "php-ast-viewer.json")]
        path: PathBuf,
    },
}

/// 指令逐行输出到 stdout，状态栏文字写入日志
fn emit(commands: &[ViewCommand]) -> Result<()> {
    for command in commands {
        if let Some(status) = command.status_text() {
            tracing::info!("{}", status);
        }
        println!("{}", serde_json::to_string(command)?);
    }
    Ok(())
}

/// 加载源码与 AST，解析失败时报错退出
fn open_viewer(config: ViewerConfig, input: &Input) -> Result<ViewerState> {
    let mut state = ViewerState::new(config);
    if let Some(source) = &input.source {
        state
            .load_source_file(source)
            .with_context(|| format!("读取源码失败: {}", source.display()))?;
    }
    state
        .load_ast_file(&input.ast)
        .with_context(|| format!("读取 AST 失败: {}", input.ast.display()))?;
    if let Some(failure) = state.last_error() {
        bail!("{}", failure.message);
    }
    tracing::info!("{}: {} 个节点", STATUS_PARSED, state.tree().map_or(0, |t| t.len()));
    Ok(state)
}

fn click_path(state: &mut ViewerState, raw: &str) -> Result<Vec<ViewCommand>> {
    let path: NodePath = raw.parse().with_context(|| format!("无法解析路径: {}", raw))?;
    Ok(state.on_node_clicked(NodeClick::Path(path)))
}

fn print_selection(state: &ViewerState) {
    match state.current_path() {
        Some(path) => {
            let crumbs: Vec<String> = state.breadcrumbs().into_iter().map(|c| c.label).collect();
            println!("# {}", crumbs.join(" > "));
            println!("# element: {}  jsonpath: {}", path.element_id(), path.to_json_path());
        }
        None => println!("# 未选中节点"),
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => ViewerConfig::load(path).with_context(|| format!("加载配置失败: {}", path.display()))?,
        None => ViewerConfig::default(),
    };

    match cli.command {
        Commands::Locate {
            input,
            offset,
            line,
            column,
            copy,
        } => {
            if input.source.is_none() {
                bail!("locate 需要 --source 以换算行列");
            }
            let mut state = open_viewer(config, &input)?;
            let query = match (offset, line, column) {
                (Some(offset), _, _) => state.document().cursor_at_offset(offset),
                (None, Some(line), Some(column)) => state.document().cursor_at(line, column),
                _ => bail!("需要 --offset 或 --line/--column"),
            };
            emit(&state.on_cursor_moved(query))?;
            print_selection(&state);

            if copy {
                if let Some(node) = state.selected_node() {
                    copy_node(node, state.config().enable_clipboard)?;
                    tracing::info!("{}", STATUS_COPIED);
                }
            }
        }
        Commands::Resolve {
            input,
            path,
            json_path,
        } => {
            let mut state = open_viewer(config, &input)?;
            let commands = match (path, json_path) {
                (Some(path), _) => click_path(&mut state, &path)?,
                (None, Some(json_path)) => state.select_json_path(&json_path)?,
                (None, None) => bail!("需要 --path 或 --json-path"),
            };
            emit(&commands)?;
            print_selection(&state);
            if let Some(pretty) = state.selected_node_pretty()? {
                println!("{}", pretty);
            }
        }
        Commands::Tree { input, path } => {
            let mut state = open_viewer(config, &input)?;
            if let Some(path) = path {
                click_path(&mut state, &path)?;
            }
            let selected = state.selected_id();
            for row in state.tree_rows() {
                let marker = if Some(row.id) == selected { '*' } else { ' ' };
                let fold = match (row.children, row.expanded) {
                    (0, _) => ' ',
                    (_, true) => '-',
                    (_, false) => '+',
                };
                println!(
                    "{}{}{} {} [{}:{}]",
                    marker,
                    "  ".repeat(row.depth as usize),
                    fold,
                    row.label,
                    row.position.start_offset,
                    row.position.end_offset
                );
            }
        }
        Commands::Json { input, path } => {
            let mut state = open_viewer(config, &input)?;
            if let Some(path) = path {
                click_path(&mut state, &path)?;
            }
            for row in state.json_rows() {
                let marker = if row.selected { '*' } else { ' ' };
                let fold = if row.collapsed { "+ " } else { "" };
                println!(
                    "{}{}{}{}: {}",
                    marker,
                    "  ".repeat(row.depth as usize),
                    fold,
                    row.name,
                    row.preview
                );
            }
        }
        Commands::Bench => {
            for result in run_performance_suite() {
                println!(
                    "{:<24} {:>8} ms  {}  {}",
                    result.operation,
                    result.duration_ms,
                    if result.success { "ok" } else { "FAILED" },
                    result.details
                );
            }
        }
        Commands::InitConfig { path } => {
            config
                .save(&path)
                .with_context(|| format!("写入配置失败: {}", path.display()))?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 初始化日志输出（stdout 留给指令输出）
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let _ = SubscriberBuilder::default()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init();

    tracing::info!("{}", STATUS_READY);
    run(cli)
}
