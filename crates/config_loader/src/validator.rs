//! 配置校验模块
//!
//! 校验规则：
//! - 网卡名称非空且唯一
//! - queue_capacity > 0 (默认值与覆盖值)
//! - timeout 策略的 timeout_ms > 0
//! - 抓包速率 > 0，帧长在以太网帧头与 u16 上限之间
//! - network 处理器必须提供合法的 addr

use std::collections::HashSet;
use std::net::SocketAddr;

use contracts::{ContractError, DeliveryPolicy, FeedBlueprint, HandlerType};

/// 以太网帧头长度
const MIN_PAYLOAD_BYTES: usize = 14;
const MAX_PAYLOAD_BYTES: usize = 65_535;

/// 校验 FeedBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &FeedBlueprint) -> Result<(), ContractError> {
    validate_interface_names(blueprint)?;
    validate_distributor(blueprint)?;
    validate_interface_overrides(blueprint)?;
    validate_capture(blueprint)?;
    validate_handler_params(blueprint)?;
    Ok(())
}

/// 校验网卡名称
fn validate_interface_names(blueprint: &FeedBlueprint) -> Result<(), ContractError> {
    if blueprint.interfaces.is_empty() {
        return Err(ContractError::config_validation(
            "interfaces",
            "at least one interface is required",
        ));
    }

    let mut seen = HashSet::new();
    for (idx, iface) in blueprint.interfaces.iter().enumerate() {
        if iface.name.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("interfaces[{idx}].name"),
                "interface name cannot be empty",
            ));
        }
        if !seen.insert(iface.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("interfaces[name={}]", iface.name),
                "duplicate interface name",
            ));
        }
    }
    Ok(())
}

/// 校验分发器默认值
fn validate_distributor(blueprint: &FeedBlueprint) -> Result<(), ContractError> {
    if blueprint.distributor.queue_capacity == 0 {
        return Err(ContractError::config_validation(
            "distributor.queue_capacity",
            "queue_capacity must be > 0",
        ));
    }
    validate_policy("distributor.policy", &blueprint.distributor.policy)
}

/// 校验网卡级覆盖值
fn validate_interface_overrides(blueprint: &FeedBlueprint) -> Result<(), ContractError> {
    for iface in &blueprint.interfaces {
        if iface.queue_capacity == Some(0) {
            return Err(ContractError::config_validation(
                format!("interfaces[{}].queue_capacity", iface.name),
                "queue_capacity must be > 0",
            ));
        }
        if let Some(policy) = &iface.policy {
            validate_policy(&format!("interfaces[{}].policy", iface.name), policy)?;
        }
    }
    Ok(())
}

fn validate_policy(field: &str, policy: &DeliveryPolicy) -> Result<(), ContractError> {
    match policy {
        DeliveryPolicy::Timeout { timeout_ms: 0 } => Err(ContractError::config_validation(
            field,
            "timeout_ms must be > 0",
        )),
        _ => Ok(()),
    }
}

/// 校验抓包参数
fn validate_capture(blueprint: &FeedBlueprint) -> Result<(), ContractError> {
    let capture = &blueprint.capture;

    if !(capture.packets_per_sec.is_finite() && capture.packets_per_sec > 0.0) {
        return Err(ContractError::config_validation(
            "capture.packets_per_sec",
            format!(
                "packets_per_sec must be a positive number, got {}",
                capture.packets_per_sec
            ),
        ));
    }

    if !(MIN_PAYLOAD_BYTES..=MAX_PAYLOAD_BYTES).contains(&capture.payload_bytes) {
        return Err(ContractError::config_validation(
            "capture.payload_bytes",
            format!(
                "payload_bytes must be within {MIN_PAYLOAD_BYTES}..={MAX_PAYLOAD_BYTES}, got {}",
                capture.payload_bytes
            ),
        ));
    }

    Ok(())
}

/// 校验处理器参数
fn validate_handler_params(blueprint: &FeedBlueprint) -> Result<(), ContractError> {
    for iface in &blueprint.interfaces {
        if iface.handler != HandlerType::Network {
            continue;
        }
        let field = format!("interfaces[{}].params.addr", iface.name);
        let addr = iface.params.get("addr").ok_or_else(|| {
            ContractError::config_validation(&field, "network handler requires 'addr'")
        })?;
        addr.parse::<SocketAddr>().map_err(|e| {
            ContractError::config_validation(&field, format!("invalid address '{addr}': {e}"))
        })?;
    }
    Ok(())
}

/// 收集非致命问题
pub fn collect_warnings(blueprint: &FeedBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.interfaces.len() < 2 {
        warnings.push(
            "Fewer than two interfaces - every packet is self-originated and will be skipped"
                .to_string(),
        );
    }

    for spec in blueprint.subscriber_specs() {
        if spec.policy.may_stall() {
            warnings.push(format!(
                "Interface '{}' uses the block policy - a stalled consumer holds up every broadcast",
                spec.interface
            ));
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{CaptureSettings, ConfigVersion, DistributorSettings, InterfaceConfig};
    use std::collections::HashMap;

    fn iface(name: &str, handler: HandlerType) -> InterfaceConfig {
        InterfaceConfig {
            name: name.into(),
            handler,
            queue_capacity: None,
            policy: None,
            params: HashMap::new(),
        }
    }

    fn blueprint(interfaces: Vec<InterfaceConfig>) -> FeedBlueprint {
        FeedBlueprint {
            version: ConfigVersion::V1,
            distributor: DistributorSettings::default(),
            capture: CaptureSettings::default(),
            interfaces,
        }
    }

    #[test]
    fn test_valid_blueprint() {
        let bp = blueprint(vec![
            iface("eth0", HandlerType::Log),
            iface("eth1", HandlerType::Counting),
        ]);
        assert!(validate(&bp).is_ok());
        assert!(collect_warnings(&bp).is_empty());
    }

    #[test]
    fn test_empty_interfaces_rejected() {
        let err = validate(&blueprint(vec![])).unwrap_err();
        assert!(err.to_string().contains("at least one interface"));
    }

    #[test]
    fn test_blank_name_rejected() {
        let err = validate(&blueprint(vec![iface("  ", HandlerType::Log)])).unwrap_err();
        assert!(err.to_string().contains("cannot be empty"));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut bp = blueprint(vec![iface("eth0", HandlerType::Log)]);
        bp.distributor.queue_capacity = 0;
        assert!(validate(&bp).is_err());

        let mut bp = blueprint(vec![iface("eth0", HandlerType::Log)]);
        bp.interfaces[0].queue_capacity = Some(0);
        let err = validate(&bp).unwrap_err();
        assert!(err.to_string().contains("interfaces[eth0].queue_capacity"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut bp = blueprint(vec![iface("eth0", HandlerType::Log)]);
        bp.interfaces[0].policy = Some(DeliveryPolicy::Timeout { timeout_ms: 0 });
        let err = validate(&bp).unwrap_err();
        assert!(err.to_string().contains("timeout_ms"));
    }

    #[test]
    fn test_capture_bounds() {
        let mut bp = blueprint(vec![iface("eth0", HandlerType::Log)]);
        bp.capture.packets_per_sec = 0.0;
        assert!(validate(&bp).is_err());

        let mut bp = blueprint(vec![iface("eth0", HandlerType::Log)]);
        bp.capture.payload_bytes = 10;
        assert!(validate(&bp).is_err());
    }

    #[test]
    fn test_network_handler_needs_addr() {
        let mut bp = blueprint(vec![iface("eth0", HandlerType::Network)]);
        assert!(validate(&bp).is_err());

        bp.interfaces[0]
            .params
            .insert("addr".into(), "not-an-addr".into());
        assert!(validate(&bp).unwrap_err().to_string().contains("invalid address"));

        bp.interfaces[0]
            .params
            .insert("addr".into(), "127.0.0.1:4000".into());
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_warnings() {
        let mut bp = blueprint(vec![iface("eth0", HandlerType::Log)]);
        bp.interfaces[0].policy = Some(DeliveryPolicy::Block);
        let warnings = collect_warnings(&bp);
        assert_eq!(warnings.len(), 2);
        assert!(warnings[1].contains("block policy"));
    }
}
