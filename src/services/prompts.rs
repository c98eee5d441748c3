//! Built-in system instructions and demo prompts.

use serde::Serialize;

/// Instruction used when a prompt-mode request leaves `system` blank.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a Mermaid code generation assistant.";

/// Instruction offered to front ends as the starting value of the system field.
pub const ARCHITECTURE_SYSTEM_PROMPT: &str = "You are a Mermaid diagram generator for system design architecture.
Goals:
- Do not simplify. The goal is to visualize a production-grade, secure, and scalable Azure architecture.
- Validate the generated code to make sure that it will render correctly.
Rules:
- Use one color in an elegant way.
- For the color styles, use classes and add them and the end of the rest of the elements.
- No epilogue or prologue.
- When appropriate, add labels between components.
Output:
- Output the Mermaid diagram code only without the markdown text block.";

const SIMPLE: &str =
    "Create a graph diagram of a user making an HTTP request to an Azure App Service over Azure Front Door.";

const INTERMEDIATE: &str = "Create a graph diagram of a user making an HTTP request to an Azure App Service over Azure Front Door. \
The App Service calls an Azure SQL Database over a private endpoint. The user should be a blue circle. \
The private endpoint should be in its own sub-diagram in a VNET. The Azure SQL Database should not be in the sub-diagram. \
Arrows should be bi-directional.";

const COMPLEX: &str = "Generate a highly detailed Azure architecture diagram using Mermaid syntax. The diagram should include:

- Azure Kubernetes Service (AKS) with multiple node pools (e.g., Linux and Windows)
- Azure Virtual Network (VNet) with subnets for AKS, Application Gateway, and private endpoints
- Azure Private DNS Zones linked to the VNet
- Azure Application Gateway with WAF enabled, integrated with AKS via ingress
- Azure Container Registry (ACR) with private endpoint
- Azure Key Vault with private endpoint
- Azure SQL Database with private endpoint
- Azure Monitor and Log Analytics workspace
- Azure Load Balancer (internal) for AKS services
- Azure Bastion for secure VM access
- Network Security Groups (NSGs) and route tables
- User-defined routes (UDRs) for traffic control
- Azure AD integration for AKS RBAC
- Azure Storage Account with private endpoint
- Azure Firewall or NVA for outbound control
- ExpressRoute or VPN Gateway for hybrid connectivity

Use Mermaid's `flowchart TD` syntax. Represent each component as a node with appropriate labels and group them logically using subgraphs. \
Show all relevant connections, including private endpoint flows, VNet peering if applicable, and traffic paths from ingress to backend services.

Do not simplify. The goal is to visualize a production-grade, secure, and scalable Azure architecture.";

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Demo {
    pub name: &'static str,
    pub prompt: &'static str,
}

/// Demo prompts, simplest first.
pub const DEMOS: [Demo; 3] = [
    Demo { name: "simple", prompt: SIMPLE },
    Demo { name: "intermediate", prompt: INTERMEDIATE },
    Demo { name: "complex", prompt: COMPLEX },
];

/// System instruction for a prompt-mode request: the caller's, or the default when blank.
#[must_use]
pub fn system_or_default(system: &str) -> &str {
    if system.trim().is_empty() { DEFAULT_SYSTEM_PROMPT } else { system }
}
