//! 配置加载器实现
//!
//! 提供TOML配置文件解析、环境变量替换和错误处理功能

use crate::config::types::{validate_config, Config};
use crate::error::{ConfigError, Result};
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 当前目录下的配置文件名
pub const LOCAL_CONFIG_FILE: &str = "host-vitals.toml";

/// 配置加载器trait，定义配置加载接口
///
/// 加载只负责解析；命令行覆盖合并完成后再调用 `validate`
#[async_trait]
pub trait ConfigLoader: Send + Sync {
    /// 从文件加载配置
    ///
    /// # 参数
    /// * `path` - 配置文件路径
    ///
    /// # 返回
    /// * `Result<Config>` - 加载的配置或错误
    async fn load_from_file<P: AsRef<Path> + Send>(&self, path: P) -> Result<Config>;

    /// 从字符串加载配置
    ///
    /// # 参数
    /// * `content` - 配置文件内容
    ///
    /// # 返回
    /// * `Result<Config>` - 加载的配置或错误
    async fn load_from_string(&self, content: &str) -> Result<Config>;

    /// 验证配置
    ///
    /// # 参数
    /// * `config` - 要验证的配置
    ///
    /// # 返回
    /// * `Result<()>` - 验证结果
    fn validate(&self, config: &Config) -> Result<()>;
}

/// TOML配置加载器实现
#[derive(Debug, Clone)]
pub struct TomlConfigLoader {
    /// 是否启用环境变量替换
    enable_env_substitution: bool,
}

impl TomlConfigLoader {
    /// 创建新的TOML配置加载器
    ///
    /// # 参数
    /// * `enable_env_substitution` - 是否启用 `${VAR}` 环境变量替换
    pub fn new(enable_env_substitution: bool) -> Self {
        Self {
            enable_env_substitution,
        }
    }

    /// 替换字符串中的环境变量
    ///
    /// 注释行原样保留，其中的 `${VAR}` 不要求变量存在
    fn substitute_env_vars(&self, content: &str) -> Result<String> {
        if !self.enable_env_substitution {
            return Ok(content.to_string());
        }

        // 匹配 ${VAR_NAME} 格式的环境变量
        let env_var_regex = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
            .map_err(|e| ConfigError::ParseError(format!("正则表达式错误: {}", e)))?;

        let mut result = String::with_capacity(content.len());

        for line in content.split_inclusive('\n') {
            if line.trim_start().starts_with('#') {
                result.push_str(line);
                continue;
            }

            let mut missing = None;
            let replaced = env_var_regex.replace_all(line, |captures: &regex::Captures| {
                std::env::var(&captures[1]).unwrap_or_else(|_| {
                    missing.get_or_insert_with(|| captures[1].to_string());
                    String::new()
                })
            });

            if let Some(var) = missing {
                return Err(ConfigError::EnvVarError { var }.into());
            }
            result.push_str(&replaced);
        }

        Ok(result)
    }

    /// 解析TOML内容
    fn parse_toml(&self, content: &str) -> Result<Config> {
        let processed_content = self.substitute_env_vars(content)?;

        let config: Config = toml::from_str(&processed_content)
            .map_err(|e| ConfigError::ParseError(format!("TOML解析失败: {}", e)))?;

        Ok(config)
    }
}

#[async_trait]
impl ConfigLoader for TomlConfigLoader {
    async fn load_from_file<P: AsRef<Path> + Send>(&self, path: P) -> Result<Config> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_string_lossy().to_string(),
            }
            .into());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::ParseError(format!("读取文件失败: {}", e)))?;

        let config = self.parse_toml(&content)?;

        info!("成功加载配置文件: {}", path.display());
        // 渠道配置的Debug输出已隐藏凭据
        debug!("配置内容: {:?}", config);

        Ok(config)
    }

    async fn load_from_string(&self, content: &str) -> Result<Config> {
        let config = self.parse_toml(content)?;
        debug!("成功解析配置字符串");
        Ok(config)
    }

    fn validate(&self, config: &Config) -> Result<()> {
        validate_config(config).map_err(|e| ConfigError::ValidationError(e).into())
    }
}

/// 获取默认配置文件路径
///
/// 优先使用当前目录下的 `host-vitals.toml`，否则使用用户配置目录下的
/// `host-vitals/config.toml`
pub fn get_default_config_path() -> PathBuf {
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.exists() {
        return local;
    }

    dirs::config_dir()
        .map(|config_dir| config_dir.join("host-vitals").join("config.toml"))
        .unwrap_or(local)
}
