//! 患者管理 CLI 客户端
//!
//! 单次命令（list / add / edit / delete）直接驱动同步控制器；
//! `shell` 子命令提供交互式界面，将输入行转换为表单/表格事件。

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use patient_manager_rust::clinic::patient::{
    patient_table_columns, ColumnKind, FormEvent, FormField, LoggingPatientListener,
    PatientRecord, RecordId, RowAction, UiEvent, ViewState, VisitType,
};
use patient_manager_rust::{ClientConfig, PatientManagerClient, StoreBackend};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

/// 患者管理 CLI 客户端
#[derive(Parser, Debug)]
#[command(name = "patient-cli")]
#[command(about = "患者管理 CLI - 列表、新增、编辑、删除患者记录", long_about = None)]
struct Args {
    /// 存储后端（http / sqlite）
    #[arg(long, default_value = "sqlite")]
    backend: StoreBackend,

    /// HTTP API 基础地址
    #[arg(long, default_value = "http://localhost:10002")]
    api_base_url: String,

    /// 认证 token
    #[arg(long, env = "PATIENT_API_TOKEN", default_value = "")]
    token: String,

    /// SQLite 数据库 URL
    #[arg(long, default_value = "sqlite://patients.db?mode=rwc")]
    db_url: String,

    /// 日志级别（默认: warn,patient_manager_rust=info）
    #[arg(long, default_value = "warn,patient_manager_rust=info")]
    log_level: String,

    /// 日志文件
    #[arg(long, default_value = "debug.log")]
    log_file: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 显示患者列表
    List,
    /// 新增患者
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        visit_type: String,
    },
    /// 编辑患者（只修改给出的字段）
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        visit_type: Option<String>,
    },
    /// 删除患者
    Delete { id: String },
    /// 交互模式
    Shell,
}

/// 初始化日志（同时输出到 stderr 和文件）
fn init_logger(log_level: &str, log_file: &str) -> Result<()> {
    use std::fs::OpenOptions;
    use std::io;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    // 优先使用环境变量 RUST_LOG（如果设置了），否则使用命令行参数
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .map_err(|e| anyhow!("无法创建日志文件 {}: {}", log_file, e))?;

    // 控制台输出走 stderr，stdout 留给表格
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_ansi(true);

    // 输出到文件，禁用 ANSI 颜色代码
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(console_layer)
        .with(file_layer)
        .init();
    Ok(())
}

/// 按列声明渲染患者表格
fn render_table(state: &ViewState) {
    let columns = patient_table_columns();
    let mut header = vec!["Id".to_string()];
    let mut actions = Vec::new();
    for column in &columns {
        match column.kind {
            ColumnKind::Text { .. } => header.push(column.label.to_string()),
            ColumnKind::Button { action, .. } => actions.push(action),
        }
    }
    println!("{}", header.join(" | "));

    for patient in &state.patients {
        let mut cells = vec![patient
            .id
            .as_ref()
            .map(|id| id.to_string())
            .unwrap_or_default()];
        for column in &columns {
            if let ColumnKind::Text { field_name } = column.kind {
                let value = match field_name {
                    "Name" => &patient.name,
                    "Email__c" => &patient.email,
                    _ => &patient.visit_type,
                };
                cells.push(value.clone());
            }
        }
        println!("{}", cells.join(" | "));
    }
    println!(
        "共 {} 条（行操作: {}）",
        state.patients.len(),
        actions.join(" / ")
    );
}

fn render_modal(state: &ViewState) {
    if !state.modal_open() {
        return;
    }
    println!("== {} ==", state.modal_header());
    println!("  name:       {}", state.draft.name);
    println!("  email:      {}", state.draft.email);
    println!("  visit_type: {}", state.draft.visit_type);
}

/// 在当前快照中查找记录，不存在时报错
fn find_row(state: &ViewState, id: &str) -> Result<PatientRecord> {
    state
        .find_patient(&RecordId::from(id))
        .cloned()
        .ok_or_else(|| anyhow!("列表中没有 ID 为 {} 的患者", id))
}

/// 等待调用完成，存在失败时返回错误
async fn settle(client: &PatientManagerClient) -> Result<ViewState> {
    client.wait_idle().await?;
    let state = client.snapshot().await?;
    if let Some(err) = &state.last_error {
        bail!("{}", err);
    }
    Ok(state)
}

async fn run_shell(client: &PatientManagerClient) -> Result<()> {
    println!("命令: list | add | edit <id> | delete <id> | set <name|email|visit_type> <值> | save | cancel | dismiss | show | types | quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (cmd, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        let event: Option<UiEvent> = match cmd {
            "" => None,
            "quit" | "exit" => break,
            "list" | "refresh" => Some(UiEvent::Refresh),
            "add" => Some(FormEvent::AddNew.into()),
            "save" => Some(FormEvent::Save.into()),
            "cancel" | "close" => Some(FormEvent::Cancel.into()),
            "dismiss" => Some(UiEvent::DismissError),
            "show" => None,
            "types" => {
                for (label, _) in VisitType::options() {
                    println!("  {}", label);
                }
                continue;
            }
            "set" => {
                let (field, value) = rest.split_once(' ').unwrap_or((rest, ""));
                match field.parse::<FormField>() {
                    Ok(field) => Some(UiEvent::field_changed(field, value.trim())),
                    Err(e) => {
                        println!("{}", e);
                        continue;
                    }
                }
            }
            "edit" | "delete" => {
                let action: RowAction = cmd.parse().map_err(|e: String| anyhow!(e))?;
                let state = client.snapshot().await?;
                match find_row(&state, rest) {
                    Ok(row) => Some(UiEvent::row_action(action, row)),
                    Err(e) => {
                        println!("{}", e);
                        continue;
                    }
                }
            }
            other => {
                println!("未知命令: {}", other);
                continue;
            }
        };

        if let Some(event) = event {
            client.dispatch(event)?;
        }
        client.wait_idle().await?;
        let state = client.snapshot().await?;
        if let Some(err) = &state.last_error {
            println!("⚠️ {}", err);
        }
        render_table(&state);
        render_modal(&state);
    }
    Ok(())
}

async fn run(args: Args) -> Result<()> {
    let config = ClientConfig {
        backend: args.backend,
        api_base_url: args.api_base_url,
        token: args.token,
        db_url: args.db_url,
        load_on_start: true,
    };
    let client =
        PatientManagerClient::connect_with_listener(config, Arc::new(LoggingPatientListener))
            .await?;

    let initial = settle(&client).await?;

    match args.command {
        Command::List => render_table(&initial),
        Command::Add {
            name,
            email,
            visit_type,
        } => {
            client.dispatch(FormEvent::AddNew)?;
            client.dispatch(UiEvent::field_changed(FormField::Name, name))?;
            client.dispatch(UiEvent::field_changed(FormField::Email, email))?;
            client.dispatch(UiEvent::field_changed(FormField::VisitType, visit_type))?;
            client.dispatch(FormEvent::Save)?;
            render_table(&settle(&client).await?);
        }
        Command::Edit {
            id,
            name,
            email,
            visit_type,
        } => {
            let row = find_row(&initial, &id)?;
            client.dispatch(UiEvent::row_action(RowAction::Edit, row))?;
            let changes = [
                (FormField::Name, name),
                (FormField::Email, email),
                (FormField::VisitType, visit_type),
            ];
            for (field, value) in changes {
                if let Some(value) = value {
                    client.dispatch(UiEvent::field_changed(field, value))?;
                }
            }
            client.dispatch(FormEvent::Save)?;
            render_table(&settle(&client).await?);
        }
        Command::Delete { id } => {
            let row = find_row(&initial, &id)?;
            client.dispatch(UiEvent::row_action(RowAction::Delete, row))?;
            render_table(&settle(&client).await?);
        }
        Command::Shell => run_shell(&client).await?,
    }

    client.shutdown().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(&args.log_level, &args.log_file)?;

    info!("[CLI] 🚀 患者管理 CLI，后端: {}", args.backend);

    if let Err(e) = run(args).await {
        error!("[CLI] ❌ {}", e);
        return Err(e);
    }
    Ok(())
}
