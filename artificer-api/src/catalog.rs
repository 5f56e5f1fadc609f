use crate::{ArtifactKind, ArtifactTypeInfo};

use ArtifactKind::{Derived, Document, Extended, Logical};

/// Every fixed artifact type as `(model, type, kind)`.
pub const BUILTIN_ARTIFACT_TYPES: &[(&str, &str, ArtifactKind)] = &[
    ("core", "Document", Document),
    ("core", "XmlDocument", Document),
    ("xsd", "XsdDocument", Document),
    ("xsd", "AttributeDeclaration", Derived),
    ("xsd", "ElementDeclaration", Derived),
    ("xsd", "SimpleTypeDeclaration", Derived),
    ("xsd", "ComplexTypeDeclaration", Derived),
    ("xsd", "XsdType", Derived),
    ("policy", "PolicyDocument", Document),
    ("policy", "PolicyExpression", Derived),
    ("policy", "PolicyAttachment", Derived),
    ("soapWsdl", "SoapAddress", Derived),
    ("soapWsdl", "SoapBinding", Derived),
    ("wsdl", "WsdlDocument", Document),
    ("wsdl", "WsdlService", Derived),
    ("wsdl", "Port", Derived),
    ("wsdl", "WsdlExtension", Derived),
    ("wsdl", "Part", Derived),
    ("wsdl", "Message", Derived),
    ("wsdl", "Fault", Derived),
    ("wsdl", "PortType", Derived),
    ("wsdl", "Operation", Derived),
    ("wsdl", "OperationInput", Derived),
    ("wsdl", "OperationOutput", Derived),
    ("wsdl", "Binding", Derived),
    ("wsdl", "BindingOperation", Derived),
    ("wsdl", "BindingOperationInput", Derived),
    ("wsdl", "BindingOperationOutput", Derived),
    ("wsdl", "BindingOperationFault", Derived),
    ("serviceImplementation", "ServiceEndpoint", Logical),
    ("serviceImplementation", "ServiceInstance", Logical),
    ("serviceImplementation", "ServiceOperation", Logical),
    ("serviceImplementation", "Organization", Logical),
    ("ext", "ExtendedArtifactType", Extended),
    ("ext", "ExtendedDocument", Extended),
    ("soa", "Actor", Logical),
    ("soa", "Choreography", Logical),
    ("soa", "ChoreographyProcess", Logical),
    ("soa", "Collaboration", Logical),
    ("soa", "CollaborationProcess", Logical),
    ("soa", "Composition", Logical),
    ("soa", "Effect", Logical),
    ("soa", "Element", Logical),
    ("soa", "Event", Logical),
    ("soa", "InformationType", Logical),
    ("soa", "Orchestration", Logical),
    ("soa", "OrchestrationProcess", Logical),
    ("soa", "Policy", Logical),
    ("soa", "PolicySubject", Logical),
    ("soa", "Process", Logical),
    ("soa", "Service", Logical),
    ("soa", "ServiceContract", Logical),
    ("soa", "ServiceComposition", Logical),
    ("soa", "ServiceInterface", Logical),
    ("soa", "System", Logical),
    ("soa", "Task", Logical),
];

/// Looks up a fixed artifact type by its exact (case-sensitive) name.
pub fn builtin_type(type_name: &str) -> Option<ArtifactTypeInfo> {
    BUILTIN_ARTIFACT_TYPES
        .iter()
        .find(|(_, name, _)| *name == type_name)
        .map(|(model, _, kind)| ArtifactTypeInfo {
            model: (*model).to_string(),
            builtin: true,
            kind: *kind,
        })
}
