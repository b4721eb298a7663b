//! MCP server handler implementation

use rmcp::{
    model::*,
    service::{RequestContext, RoleServer},
    ErrorData as McpError, ServerHandler,
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::client::RailgunApi;
use crate::config::Settings;
use crate::context::ToolContext;
use crate::error::ToolOutcome;
use crate::{assistant, multi_wallet, recipes, relayers, transactions, utility, wallets};

const CONFIG_URI: &str = "railgun://config";
const NETWORKS_URI: &str = "railgun://networks";

/// Every tool the server exposes, in listing order
pub fn all_tools() -> Vec<Tool> {
    let mut tools = wallets::get_wallet_tools();
    tools.extend(transactions::get_transaction_tools());
    tools.extend(recipes::get_recipe_tools());
    tools.extend(relayers::get_relayer_tools());
    tools.extend(multi_wallet::get_multi_wallet_tools());
    tools.extend(assistant::get_assistant_tools());
    tools.extend(utility::get_utility_tools());
    tools
}

/// MCP server handler
#[derive(Clone)]
pub struct RailgunMcpHandler {
    ctx: ToolContext,
}

impl RailgunMcpHandler {
    pub fn new(api: Arc<dyn RailgunApi>, settings: Settings) -> Self {
        Self {
            ctx: ToolContext::new(api, settings),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.ctx.settings
    }

    /// Run the named tool. Unknown names are a protocol error; tool failures are not.
    pub async fn dispatch(
        &self,
        name: &str,
        args: Option<&JsonObject>,
    ) -> Result<ToolOutcome, McpError> {
        let ctx = &self.ctx;
        debug!(tool = name, "calling tool");

        let result = match name {
            "create_wallet" => wallets::handle_create_wallet(ctx, args).await,
            "import_wallet" => wallets::handle_import_wallet(ctx, args).await,
            "list_wallets" => wallets::handle_list_wallets(ctx, args).await,
            "get_balance" => wallets::handle_get_balance(ctx, args).await,

            "shield_tokens" => transactions::handle_shield_tokens(ctx, args).await,
            "unshield_tokens" => transactions::handle_unshield_tokens(ctx, args).await,
            "private_transfer" => transactions::handle_private_transfer(ctx, args).await,
            "get_transaction_status" => {
                transactions::handle_get_transaction_status(ctx, args).await
            }
            "get_transaction_history" => {
                transactions::handle_get_transaction_history(ctx, args).await
            }

            "create_recipe" => recipes::handle_create_recipe(ctx, args).await,
            "execute_recipe" => recipes::handle_execute_recipe(ctx, args).await,
            "estimate_recipe_gas" => recipes::handle_estimate_recipe_gas(ctx, args).await,
            "create_swap_recipe" => recipes::handle_create_swap_recipe(ctx, args).await,

            "get_relayers" => relayers::handle_get_relayers(ctx, args).await,
            "submit_to_relayer" => relayers::handle_submit_to_relayer(ctx, args).await,

            "create_wallet_batch" => multi_wallet::handle_create_wallet_batch(ctx, args).await,
            "distribute_tokens" => multi_wallet::handle_distribute_tokens(ctx, args).await,
            "mix_tokens" => multi_wallet::handle_mix_tokens(ctx, args).await,
            "get_wallet_analytics" => multi_wallet::handle_get_wallet_analytics(ctx, args).await,

            "can_i_afford_this" => assistant::handle_can_i_afford_this(ctx, args).await,
            "why_is_this_so_expensive" => {
                assistant::handle_why_is_this_so_expensive(ctx, args).await
            }
            "just_send_money" => assistant::handle_just_send_money(ctx, args).await,
            "where_are_my_tokens" => assistant::handle_where_are_my_tokens(ctx, args).await,
            "fix_stuck_transaction" => assistant::handle_fix_stuck_transaction(ctx, args).await,
            "optimize_my_privacy" => assistant::handle_optimize_my_privacy(ctx, args).await,
            "emergency_exit" => assistant::handle_emergency_exit(ctx, args).await,

            "get_gas_price" => utility::handle_get_gas_price(ctx, args).await,
            "get_supported_tokens" => utility::handle_get_supported_tokens(ctx, args).await,
            "verify_proof" => utility::handle_verify_proof(ctx, args).await,
            "check_config" => utility::handle_check_config(ctx, args).await,

            _ => {
                return Err(McpError::invalid_params(
                    format!("Unknown tool: {}", name),
                    None,
                ))
            }
        };

        if let Err(e) = &result {
            warn!(tool = name, kind = ?e.kind(), error = %e, "tool failed");
        }
        Ok(ToolOutcome::from(result))
    }

    fn json_resource(
        uri: String,
        value: &serde_json::Value,
    ) -> Result<ReadResourceResult, McpError> {
        let text = serde_json::to_string_pretty(value)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;

        Ok(ReadResourceResult {
            contents: vec![ResourceContents::TextResourceContents {
                uri,
                mime_type: Some("application/json".to_string()),
                text,
                meta: None,
            }],
        })
    }
}

impl ServerHandler for RailgunMcpHandler {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::default(),
            capabilities: ServerCapabilities {
                prompts: None,
                resources: Some(ResourcesCapability {
                    subscribe: None,
                    list_changed: None,
                }),
                tools: Some(ToolsCapability {
                    list_changed: None,
                }),
                logging: None,
                completions: None,
                experimental: None,
            },
            server_info: Implementation {
                name: "railgun-mcp-server".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: Some("Railgun MCP Server".to_string()),
                icons: None,
                website_url: Some("https://railgun.org".to_string()),
            },
            instructions: Some("MCP server for private DeFi on Railgun: wallets, shielding, private transfers, recipes, relayers, multi-wallet operations and plain-English helpers. Configure with RAILGUN_API_KEY and RAILGUN_WALLET_PASSWORD or ~/.railgun/config.json".into()),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            tools: all_tools(),
            next_cursor: None,
        })
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        let mut config_resource = RawResource::new(CONFIG_URI, "Server Configuration");
        config_resource.description = Some(
            "Configuration status with secrets reduced to set/unset flags".to_string(),
        );
        config_resource.mime_type = Some("application/json".to_string());

        let mut networks_resource = RawResource::new(NETWORKS_URI, "Supported Networks");
        networks_resource.description = Some(
            "Chain IDs, RPC hosts and Railgun contract addresses per network".to_string(),
        );
        networks_resource.mime_type = Some("application/json".to_string());

        Ok(ListResourcesResult {
            resources: vec![
                config_resource.no_annotation(),
                networks_resource.no_annotation(),
            ],
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        match request.uri.as_str() {
            CONFIG_URI => {
                Self::json_resource(request.uri, &utility::config_report(self.settings()))
            }
            NETWORKS_URI => {
                Self::json_resource(request.uri, &utility::networks_report(self.settings()))
            }
            _ => Err(McpError::invalid_params(
                format!("Unknown resource URI: {}", request.uri),
                None,
            )),
        }
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let outcome = self
            .dispatch(&request.name, request.arguments.as_ref())
            .await?;
        Ok(outcome.into_call_result())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::{args, FakeApi};
    use serde_json::{json, Value};
    use std::collections::HashSet;

    fn test_settings() -> Settings {
        Settings {
            api_key: Some("test-key".to_string()),
            wallet_password: Some("pw".to_string()),
            ..Settings::default()
        }
    }

    fn create_test_handler(api: FakeApi) -> RailgunMcpHandler {
        RailgunMcpHandler::new(Arc::new(api), test_settings())
    }

    fn outcome_text(result: &CallToolResult) -> Value {
        let text = result.content[0]
            .as_text()
            .map(|t| t.text.clone())
            .unwrap_or_default();
        serde_json::from_str(&text).unwrap()
    }

    /// Test that server info contains correct name, version, and instructions
    #[test]
    fn test_get_info_returns_valid_server_info() {
        let handler = create_test_handler(FakeApi::new());
        let info = handler.get_info();

        assert_eq!(info.server_info.name, "railgun-mcp-server");
        assert_eq!(info.server_info.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(
            info.server_info.title,
            Some("Railgun MCP Server".to_string())
        );
        assert!(info.instructions.is_some());
    }

    /// Test that server advertises resources and tools but not prompts
    #[test]
    fn test_get_info_capabilities() {
        let handler = create_test_handler(FakeApi::new());
        let info = handler.get_info();

        assert!(info.capabilities.resources.is_some());
        assert!(info.capabilities.tools.is_some());
        assert!(info.capabilities.prompts.is_none());
    }

    #[test]
    fn test_all_tools_unique_and_complete() {
        let tools = all_tools();
        let names: HashSet<String> = tools.iter().map(|t| t.name.to_string()).collect();

        assert_eq!(tools.len(), 30);
        assert_eq!(names.len(), tools.len());
        for expected in [
            "create_wallet",
            "get_transaction_history",
            "create_swap_recipe",
            "submit_to_relayer",
            "create_wallet_batch",
            "emergency_exit",
            "check_config",
        ] {
            assert!(names.contains(expected), "missing tool {}", expected);
        }
    }

    #[test]
    fn test_every_tool_has_object_schema() {
        for tool in all_tools() {
            assert_eq!(
                tool.input_schema.get("type"),
                Some(&Value::String("object".to_string())),
                "tool {} schema is not an object",
                tool.name
            );
            assert!(tool.description.is_some());
        }
    }

    /// Every listed tool must be routed by dispatch
    /// Valid arguments for every tool that reaches the backend
    fn valid_args(tool: &str) -> Option<Value> {
        let wallet = json!({"wallet_id": "w1"});
        let transfer = json!({
            "wallet_id": "w1",
            "token_address": "0xusdc",
            "amount": "1000",
            "recipient_0zk_address": "0zkbob"
        });
        let args = match tool {
            "create_wallet" | "get_relayers" | "get_gas_price" | "get_supported_tokens" => {
                json!({"network": "ethereum"})
            }
            "import_wallet" => json!({"private_key": "0xkey", "network": "ethereum"}),
            "list_wallets" => json!({}),
            "get_balance"
            | "get_transaction_history"
            | "where_are_my_tokens"
            | "fix_stuck_transaction"
            | "optimize_my_privacy" => wallet,
            "shield_tokens" | "unshield_tokens" | "private_transfer" => transfer,
            "get_transaction_status" => json!({"transaction_id": "t1"}),
            "create_recipe" => json!({
                "name": "n",
                "description": "d",
                "network": "ethereum",
                "steps": [{"type": "swap"}]
            }),
            "execute_recipe" | "estimate_recipe_gas" => json!({
                "wallet_id": "w1",
                "recipe_id": "r1",
                "input_amounts": [{"token_address": "0xusdc", "amount": "1"}]
            }),
            "create_swap_recipe" => json!({
                "network": "ethereum",
                "sell_token": "0xa",
                "buy_token": "0xb"
            }),
            "submit_to_relayer" => json!({"transaction_data": "0xdata", "relayer_id": "r1"}),
            "create_wallet_batch" => json!({
                "count": 2,
                "network": "ethereum",
                "password_prefix": "batch"
            }),
            "distribute_tokens" => json!({
                "source_wallet_id": "w1",
                "token_address": "0xusdc",
                "total_amount": "100",
                "destination_wallet_ids": ["w2", "w3"]
            }),
            "get_wallet_analytics" => json!({"wallet_ids": ["w1", "w2"]}),
            "can_i_afford_this" => json!({"wallet_id": "w1", "action": "swap"}),
            "why_is_this_so_expensive" => json!({"action": "shield"}),
            "just_send_money" => json!({
                "wallet_id": "w1",
                "to": "0zkbob",
                "amount": "5 USDC",
                "keep_private": true
            }),
            "emergency_exit" => json!({"wallet_id": "w1", "destination": "0xsafe"}),
            "verify_proof" => json!({"proof_data": "0xproof"}),
            _ => return None,
        };
        Some(args)
    }

    #[tokio::test]
    async fn test_every_tool_fails_cleanly_when_backend_fails() {
        for tool in all_tools() {
            let Some(tool_args) = valid_args(&tool.name) else {
                assert!(
                    ["check_config", "mix_tokens"].contains(&tool.name.as_ref()),
                    "no arguments for {}",
                    tool.name
                );
                continue;
            };

            // No routes: every backend call answers 404
            let api = Arc::new(FakeApi::new());
            let handler = RailgunMcpHandler::new(api.clone(), test_settings());

            let body = handler
                .dispatch(&tool.name, Some(&args(tool_args)))
                .await
                .unwrap()
                .to_json();

            assert_eq!(body["success"], false, "tool {} succeeded", tool.name);
            assert!(body["error"].is_string(), "tool {} has no error", tool.name);
            assert_eq!(body["error_kind"], "api", "tool {} failed locally", tool.name);
            assert!(!api.calls().is_empty(), "tool {} made no call", tool.name);
        }
    }

    #[tokio::test]
    async fn test_unknown_tool_is_protocol_error() {
        let handler = create_test_handler(FakeApi::new());
        assert!(handler.dispatch("launch_rockets", None).await.is_err());
    }

    #[tokio::test]
    async fn test_success_result_shape() {
        let api = FakeApi::new().on_get("/wallets", json!({"wallets": []}));
        let handler = create_test_handler(api);

        let result = handler
            .dispatch("list_wallets", None)
            .await
            .unwrap()
            .into_call_result();

        assert_eq!(result.is_error, Some(false));
        let body = outcome_text(&result);
        assert_eq!(body["success"], true);
        assert_eq!(body["count"], 0);
    }

    #[tokio::test]
    async fn test_backend_failure_result_shape() {
        let api = FakeApi::new().fail_get("/gas-price/ethereum", 502, "bad gateway");
        let handler = create_test_handler(api);

        let result = handler
            .dispatch("get_gas_price", Some(&args(json!({"network": "ethereum"}))))
            .await
            .unwrap()
            .into_call_result();

        assert_eq!(result.is_error, Some(true));
        let body = outcome_text(&result);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "API request failed: 502 - bad gateway");
        assert_eq!(body["error_kind"], "api");
    }

    #[tokio::test]
    async fn test_invalid_arguments_are_tool_failures() {
        let handler = create_test_handler(FakeApi::new());

        let outcome = handler
            .dispatch("shield_tokens", Some(&args(json!({"wallet_id": 5}))))
            .await
            .unwrap();

        let body = outcome.to_json();
        assert_eq!(body["success"], false);
        assert_eq!(body["error_kind"], "invalid_params");
    }

    #[tokio::test]
    async fn test_check_config_needs_no_backend() {
        let handler = create_test_handler(FakeApi::new());

        let body = handler
            .dispatch("check_config", None)
            .await
            .unwrap()
            .to_json();

        assert_eq!(body["success"], true);
        assert_eq!(body["config"]["api_key_set"], true);
        assert_eq!(body["config"]["wallet_password_set"], true);
    }

    #[test]
    fn test_resources_render_settings() {
        let handler = create_test_handler(FakeApi::new());

        let config = RailgunMcpHandler::json_resource(
            CONFIG_URI.to_string(),
            &utility::config_report(handler.settings()),
        )
        .unwrap();
        match &config.contents[0] {
            ResourceContents::TextResourceContents { text, mime_type, .. } => {
                assert_eq!(mime_type.as_deref(), Some("application/json"));
                assert!(!text.contains("test-key"));
                assert!(text.contains("api_key_set"));
            }
            other => panic!("unexpected contents {:?}", other),
        }
    }
}
