use crate::config::AuthPolicy;
use crate::domain::Role;
use crate::error::{AppError, AppResult};
use crate::services::auth::AuthService;
use crate::state::AppState;

/// 启动时创建首个 AUTHORITY 账号：
/// - 已有任意 authority：不做任何事
/// - 配置的 email/username 已被占用：记录警告后跳过
/// - 否则注册一个新的 authority
pub async fn ensure_bootstrap_authority(state: &AppState) -> AppResult<()> {
    let Some(cfg) = state.auth.bootstrap.clone() else {
        return Ok(());
    };

    if state.profiles.count_by_role(Role::Authority).await? > 0 {
        return Ok(());
    }

    let service = AuthService::with_policy(
        state,
        AuthPolicy {
            allow_authority_signup: true,
            ..state.auth.clone()
        },
    );

    match service
        .register(&cfg.email, &cfg.password, &cfg.username, Role::Authority)
        .await
    {
        Ok(signed_in) => {
            service.logout(&signed_in.session).await?;
            tracing::info!(username = %cfg.username, "bootstrap authority created");
            Ok(())
        }
        Err(AppError::Conflict(msg)) => {
            tracing::warn!("bootstrap authority not created: {}", msg);
            Ok(())
        }
        Err(err) => Err(err),
    }
}
