// Route dispatch: decode a request body, run the bridge operation, and wrap
// the outcome in the route's response envelope.

use serde::de::DeserializeOwned;

use alchemist_protocol::{ConvertRuleRequest, ModifyRequest, Route, RouteResponse, TableRequest};

use crate::bridge::AiBridge;
use crate::client::{AiError, Completion};

/// Handle one request. Every failure becomes `{success: false, error}`.
pub fn handle<C: Completion>(bridge: &AiBridge<C>, route: Route, body: &str) -> RouteResponse {
    match dispatch(bridge, route, body) {
        Ok(response) => response,
        Err(e) => {
            log::warn!("{} failed: {}", route, e);
            RouteResponse::failure(e.to_string())
        }
    }
}

fn dispatch<C: Completion>(
    bridge: &AiBridge<C>,
    route: Route,
    body: &str,
) -> Result<RouteResponse, AiError> {
    match route {
        Route::ConvertRule => {
            let req: ConvertRuleRequest = decode(body)?;
            bridge.convert_rule(&req.prompt).map(RouteResponse::rules)
        }
        Route::FixData => {
            let table = decode_table(body)?;
            bridge.fix(&table).map(RouteResponse::table)
        }
        Route::ModifyData => {
            let req: ModifyRequest = decode(body)?;
            let (table, prompt) = req
                .into_parts()
                .map_err(|e| AiError::InvalidInput(e.to_string()))?;
            bridge.modify(&table, &prompt).map(RouteResponse::modified)
        }
        Route::ValidateAi => {
            let table = decode_table(body)?;
            bridge.validate(&table).map(RouteResponse::findings)
        }
        Route::RecommendRules => {
            let table = decode_table(body)?;
            bridge.recommend_rules(&table).map(RouteResponse::suggestions)
        }
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, AiError> {
    serde_json::from_str(body).map_err(|e| AiError::InvalidInput(format!("invalid request: {}", e)))
}

fn decode_table(body: &str) -> Result<alchemist_engine::Table, AiError> {
    let req: TableRequest = decode(body)?;
    req.into_table()
        .map_err(|e| AiError::InvalidInput(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::CompletionRequest;
    use alchemist_config::settings::Temperatures;
    use serde_json::{json, Value};
    use std::cell::Cell;

    struct Fixed {
        reply: &'static str,
        calls: Cell<usize>,
    }

    impl Completion for Fixed {
        fn complete(&self, _request: &CompletionRequest) -> Result<String, AiError> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.reply.to_string())
        }
    }

    fn run(reply: &'static str, route: Route, body: Value) -> (Value, usize) {
        let bridge = AiBridge::new(Fixed { reply, calls: Cell::new(0) }, Temperatures::default());
        let response = handle(&bridge, route, &body.to_string());
        (serde_json::to_value(response).unwrap(), bridge.client().calls.get())
    }

    #[test]
    fn test_fix_data_route() {
        let (value, _) = run(
            "A,B\n1,5",
            Route::FixData,
            json!({"headers": ["A", "B"], "data": [["1", "2"]]}),
        );
        assert_eq!(value, json!({"success": true, "headers": ["A", "B"], "data": [["1", "5"]]}));
    }

    #[test]
    fn test_modify_data_route() {
        let (value, _) = run(
            "A,B\n2,4",
            Route::ModifyData,
            json!({"headers": ["A", "B"], "data": [["1", "2"]], "prompt": "double everything"}),
        );
        assert_eq!(
            value,
            json!({"success": true, "headers": ["A", "B"], "updatedData": [["2", "4"]]})
        );
    }

    #[test]
    fn test_convert_rule_route_failure_envelope() {
        let (value, _) = run("not json", Route::ConvertRule, json!({"prompt": "Co-run T1 and T2"}));
        assert_eq!(value["success"], json!(false));
        assert!(value["error"].as_str().unwrap().starts_with("failed to parse AI response"));
    }

    #[test]
    fn test_validate_and_recommend_routes() {
        let body = json!({"headers": ["A"], "data": [["1"]]});
        let (value, _) = run("- looks fine", Route::ValidateAi, body.clone());
        assert_eq!(value, json!({"success": true, "findings": "- looks fine"}));

        let (value, _) = run("1. Co-run T1 and T2", Route::RecommendRules, body);
        assert_eq!(value, json!({"success": true, "suggestions": "1. Co-run T1 and T2"}));
    }

    #[test]
    fn test_ragged_request_rejected_before_call() {
        let (value, calls) = run(
            "A,B\n1,2",
            Route::FixData,
            json!({"headers": ["A", "B"], "data": [["1", "2", "3"]]}),
        );
        assert_eq!(value["success"], json!(false));
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_malformed_body() {
        let (value, calls) = run("", Route::ValidateAi, json!("just a string"));
        assert!(value["error"].as_str().unwrap().starts_with("invalid request"));
        assert_eq!(calls, 0);
    }
}
