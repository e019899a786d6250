use clap::Parser;

/// GraphQL API 请求监控与告警服务
#[derive(Parser, Debug)]
#[command(name = "graphmon", version, about)]
pub struct Args {
    /// 配置文件路径
    #[arg(short, long)]
    pub config: Option<String>,

    /// 覆盖配置中的监听端口
    #[arg(short, long)]
    pub port: Option<u16>,

    /// 覆盖配置中的 SQLite 数据库路径
    #[arg(long)]
    pub db_path: Option<String>,
}
