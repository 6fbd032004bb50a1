// Copyright 2025 The OntoCore Authors.

//! The embedded core ontology
//!
//! The domain schema every installation starts from, expressed as the
//! extract shapes of [`crate::kb`]. An application ontology read from an
//! OWL file merges over these extracts; this module is the fixed baseline
//! so the crate is usable with no ontology file at all.

use crate::kb::{ClassExtract, KnowledgeBase, NamespaceExtract, PropertyExtract};
use crate::names::{CORE_NS_PREFIX, CORE_NS_URI};

fn cls(id: &str, bases: &[&str], abbreviation: &str, definition: &str) -> ClassExtract {
    ClassExtract {
        id: id.to_string(),
        id_ns: CORE_NS_PREFIX.to_string(),
        name: crate::names::to_external_name(id),
        bases: bases.iter().map(|b| b.to_string()).collect(),
        definition: definition.to_string(),
        abbreviation: abbreviation.to_string(),
    }
}

fn dt(id: &str, domain: &str, range: &str, definition: &str) -> PropertyExtract {
    PropertyExtract {
        id: id.to_string(),
        id_ns: CORE_NS_PREFIX.to_string(),
        name: id.replace('_', " "),
        domain: domain.to_string(),
        range: range.to_string(),
        functional: true,
        is_datatype: true,
        is_inverse: false,
        inverse_of: String::new(),
        inverse_functional: false,
        definition: definition.to_string(),
    }
}

fn obj(id: &str, domain: &str, range: &str, definition: &str) -> PropertyExtract {
    PropertyExtract {
        id: id.to_string(),
        id_ns: CORE_NS_PREFIX.to_string(),
        name: id.replace('_', " "),
        domain: domain.to_string(),
        range: range.to_string(),
        functional: true,
        is_datatype: false,
        is_inverse: false,
        inverse_of: String::new(),
        inverse_functional: false,
        definition: definition.to_string(),
    }
}

fn inv(id: &str, domain: &str, range: &str, inverse_of: &str, definition: &str) -> PropertyExtract {
    PropertyExtract {
        id: id.to_string(),
        id_ns: CORE_NS_PREFIX.to_string(),
        name: id.replace('_', " "),
        domain: domain.to_string(),
        range: range.to_string(),
        functional: false,
        is_datatype: false,
        is_inverse: true,
        inverse_of: inverse_of.to_string(),
        inverse_functional: false,
        definition: definition.to_string(),
    }
}

/// The core knowledge base: namespace, classes, and properties
pub fn core_knowledge_base() -> KnowledgeBase {
    KnowledgeBase::from_extracts(core_namespaces(), core_classes(), core_properties())
}

fn core_namespaces() -> Vec<NamespaceExtract> {
    vec![NamespaceExtract {
        prefix: CORE_NS_PREFIX.to_string(),
        uri: CORE_NS_URI.to_string(),
        names: core_classes()
            .iter()
            .map(|c| c.id.clone())
            .chain(core_properties().iter().map(|p| p.id.clone()))
            .collect(),
        meta_level: 10,
        complete: true,
        iteration: 0,
        version: "2.0.0".to_string(),
    }]
}

fn core_classes() -> Vec<ClassExtract> {
    vec![
        cls("Identifiable", &[], "", "Anything with an oid and audit metadata."),
        cls("Modelable", &["Identifiable"], "", "An Identifiable that can carry parameters, data elements, and models."),
        cls("Actor", &["Identifiable"], "", "A party that can create, own, or be assigned to things."),
        cls("Person", &["Actor"], "", "A human user."),
        cls("Organization", &["Actor"], "Org", "An organization; may own managed objects and contain sub-organizations."),
        cls("Project", &["Organization"], "Proj", "A project: an organization that owns systems and requirements."),
        cls("ManagedObject", &["Modelable"], "MO", "A Modelable under configuration management, with an owner."),
        cls("Product", &["ManagedObject"], "Prod", "A versionable engineering artifact that can be assembled from components."),
        cls("HardwareProduct", &["Product"], "HW", "A physical product with mass, power, and data rate parameters."),
        cls("SoftwareProduct", &["Product"], "SW", "A software product."),
        cls("DigitalProduct", &["Product"], "Digital", "A purely digital product such as a document."),
        cls("Template", &["Product"], "Tmpl", "A product definition used as a starting point for new products."),
        cls("ProductType", &["ManagedObject"], "PT", "A classification of products (antenna, battery, thruster, ...)."),
        cls("ActivityType", &["ManagedObject"], "AT", "A classification of activities."),
        cls("Activity", &["ManagedObject"], "Act", "Something that happens over an interval; owns modal definitions."),
        cls("Mission", &["Activity"], "Msn", "The top-level activity of a project."),
        cls("ActCompRel", &["Identifiable"], "ACR", "Activity composition: a sub-activity within a composite activity."),
        cls("Acu", &["Identifiable"], "Acu", "Assembly component usage: an occurrence of a component product within an assembly product."),
        cls("ProjectSystemUsage", &["Identifiable"], "PSU", "Usage of a product as a top-level system of a project."),
        cls("Port", &["Modelable"], "", "A connection point of a product."),
        cls("PortType", &["ManagedObject"], "", "A classification of ports."),
        cls("PortTemplate", &["ManagedObject"], "", "A template from which ports are created."),
        cls("Flow", &["Identifiable"], "", "A flow between two ports in an assembly context."),
        cls("Model", &["ManagedObject"], "Mdl", "A model of a Modelable thing."),
        cls("ModelType", &["ManagedObject"], "", "A classification of models."),
        cls("ModelFamily", &["ManagedObject"], "", "A family of model types."),
        cls("Representation", &["Identifiable"], "Rep", "A concrete representation of a model."),
        cls("RepresentationFile", &["Identifiable"], "RepFile", "A file belonging to a representation."),
        cls("Requirement", &["ManagedObject"], "Rqt", "A requirement, possibly with a computable constraint."),
        cls("RequirementAncestry", &["Identifiable"], "RqtAnc", "Parent/child relationship between requirements."),
        cls("Relation", &["Identifiable"], "Rel", "A mathematical relation; the computable form of a requirement."),
        cls("ParameterRelation", &["Identifiable"], "ParmRel", "Correlates a relation with a parameter definition."),
        cls("Role", &["ManagedObject"], "", "A role that can be assigned to a person in an organization."),
        cls("RoleAssignment", &["Identifiable"], "RA", "Assignment of a role to a person in an organizational context."),
        cls("Discipline", &["ManagedObject"], "", "An engineering discipline."),
        cls("DisciplineRole", &["Identifiable"], "DR", "Associates a role with a discipline."),
        cls("DisciplineProductType", &["Identifiable"], "DPT", "Associates a discipline with a relevant product type."),
        cls("DataElementDefinition", &["ManagedObject"], "DED", "Definition of a data element (typed, non-dimensional value)."),
        cls("ParameterDefinition", &["DataElementDefinition"], "PD", "Definition of a parameter variable with dimensions."),
        cls("ParameterContext", &["ManagedObject"], "PC", "A context qualifying a parameter variable (CBE, MEV, peak, ...)."),
    ]
}

fn core_properties() -> Vec<PropertyExtract> {
    let mut props = vec![
        // Identifiable
        dt("oid", "Identifiable", "str", "Opaque unique identifier."),
        dt("id", "Identifiable", "str", "Human-meaningful identifier."),
        dt("id_ns", "Identifiable", "str", "Namespace of the id."),
        dt("name", "Identifiable", "str", "Display name."),
        dt("description", "Identifiable", "str", "Narrative description."),
        dt("comment", "Identifiable", "str", "Free-form comment."),
        dt("url", "Identifiable", "str", "Associated URL."),
        dt("create_datetime", "Identifiable", "datetime", "Creation timestamp (UTC)."),
        dt("mod_datetime", "Identifiable", "datetime", "Last modification timestamp (UTC)."),
        obj("creator", "Identifiable", "Person", "The person who created the object."),
        obj("modifier", "Identifiable", "Person", "The person who last modified the object."),
        // Person
        dt("first_name", "Person", "str", "First name."),
        dt("last_name", "Person", "str", "Last name."),
        dt("mi_or_name", "Person", "str", "Middle initial or name."),
        dt("email", "Person", "str", "Email address."),
        obj("org", "Person", "Organization", "The person's home organization."),
        // Organization
        obj("parent_organization", "Organization", "Organization", "The containing organization."),
        // ManagedObject
        obj("owner", "ManagedObject", "Organization", "The organization that owns the object."),
        dt("abbreviation", "ManagedObject", "str", "Short form of the name."),
        dt("public", "ManagedObject", "bool", "True if visible to all users."),
        // Product
        dt("version", "Product", "str", "Version designator."),
        dt("iteration", "Product", "int", "Iteration within the version; bumped on save."),
        dt("version_sequence", "Product", "int", "Ordinal of the version in the version history."),
        dt("frozen", "Product", "bool", "True if the product definition is locked."),
        obj("product_type", "Product", "ProductType", "The product's type classification."),
        // Activity
        obj("activity_type", "Activity", "ActivityType", "The activity's type classification."),
        obj("of_system", "Activity", "Product", "The system the activity pertains to."),
        // ActCompRel
        obj("composite_activity", "ActCompRel", "Activity", "The containing activity."),
        obj("sub_activity", "ActCompRel", "Activity", "The contained activity."),
        dt("sub_activity_role", "ActCompRel", "str", "Role of the sub-activity in the composite."),
        // Acu
        obj("assembly", "Acu", "Product", "The assembly product."),
        obj("component", "Acu", "Product", "The component product."),
        dt("quantity", "Acu", "int", "Number of occurrences of the component."),
        dt("reference_designator", "Acu", "str", "Positional designator within the assembly."),
        dt("assembly_level", "Acu", "str", "Level of the usage within the assembly."),
        obj("product_type_hint", "Acu", "ProductType", "Intended product type when the component is TBD."),
        // ProjectSystemUsage
        obj("project", "ProjectSystemUsage", "Project", "The project using the system."),
        obj("system", "ProjectSystemUsage", "Product", "The product used as a system."),
        dt("system_role", "ProjectSystemUsage", "str", "Role of the system in the project."),
        // Port
        obj("of_product", "Port", "Product", "The product the port belongs to."),
        obj("type_of_port", "Port", "PortType", "The port's type."),
        dt("directionality", "Port", "str", "input, output, or empty for bidirectional."),
        // Flow
        obj("start_port", "Flow", "Port", "The port the flow starts from."),
        obj("end_port", "Flow", "Port", "The port the flow ends at."),
        obj("start_port_context", "Flow", "Product", "Assembly context of the start port."),
        obj("end_port_context", "Flow", "Product", "Assembly context of the end port."),
        obj("flow_context", "Flow", "Product", "The assembly within which the flow exists."),
        // Model
        obj("of_thing", "Model", "Modelable", "The thing the model describes."),
        obj("type_of_model", "Model", "ModelType", "The model's type."),
        // ModelType
        obj("model_type_family", "ModelType", "ModelFamily", "The family of the model type."),
        // Representation
        obj("of_model", "Representation", "Model", "The model being represented."),
        obj("of_object", "RepresentationFile", "Representation", "The representation the file belongs to."),
        // Requirement
        dt("rqt_type", "Requirement", "str", "functional or performance."),
        dt("rqt_level", "Requirement", "str", "Requirement level."),
        dt("rqt_compliance", "Requirement", "str", "None, Partial, or Full."),
        dt("rationale", "Requirement", "str", "Why the requirement exists."),
        dt("justification", "Requirement", "str", "Justification of the requirement values."),
        dt("validated", "Requirement", "bool", "True if the requirement has been validated."),
        dt("verification_method", "Requirement", "str", "How compliance is verified."),
        dt("rqt_constraint_type", "Requirement", "str", "single_value, maximum, or minimum."),
        dt("rqt_tolerance_type", "Requirement", "str", "symmetric or asymmetric."),
        dt("rqt_units", "Requirement", "str", "Units of the constraint values."),
        dt("rqt_target_value", "Requirement", "float", "Target value for single_value constraints."),
        dt("rqt_maximum_value", "Requirement", "float", "Maximum (not-to-exceed) value."),
        dt("rqt_minimum_value", "Requirement", "float", "Minimum value."),
        dt("rqt_tolerance", "Requirement", "float", "Symmetric tolerance."),
        dt("rqt_tolerance_upper", "Requirement", "float", "Upper tolerance when asymmetric."),
        dt("rqt_tolerance_lower", "Requirement", "float", "Lower tolerance when asymmetric."),
        obj("allocated_to", "Requirement", "Identifiable", "The usage or project the requirement is allocated to."),
        obj("computable_form", "Requirement", "Relation", "The relation expressing the requirement's constraint."),
        // Relation
        dt("formulation", "Relation", "str", "Textual formulation of the relation."),
        // ParameterRelation
        obj("referenced_relation", "ParameterRelation", "Relation", "The relation being parameterized."),
        obj("correlates_parameter", "ParameterRelation", "ParameterDefinition", "The correlated parameter definition."),
        // RequirementAncestry
        obj("parent_requirement", "RequirementAncestry", "Requirement", "The parent requirement."),
        obj("child_requirement", "RequirementAncestry", "Requirement", "The child requirement."),
        // RoleAssignment
        obj("assigned_role", "RoleAssignment", "Role", "The role being assigned."),
        obj("assigned_to", "RoleAssignment", "Person", "The person receiving the role."),
        obj("role_assignment_context", "RoleAssignment", "Organization", "The organization in which the role applies; empty for global roles."),
        // Discipline associations
        obj("related_to_discipline", "DisciplineRole", "Discipline", "The discipline of the association."),
        obj("related_role", "DisciplineRole", "Role", "The role of the association."),
        obj("used_in_discipline", "DisciplineProductType", "Discipline", "The discipline of the association."),
        obj("relevant_product_type", "DisciplineProductType", "ProductType", "The product type relevant to the discipline."),
        // Definitions
        dt("range_datatype", "DataElementDefinition", "str", "Datatype of the defined value."),
        dt("label", "DataElementDefinition", "str", "Column-header label."),
        dt("dimensions", "ParameterDefinition", "str", "Physical dimension of the variable."),
        dt("context_type", "ParameterContext", "str", "Kind of context (descriptive, modal, ...)."),
        dt("context_datatype", "ParameterContext", "str", "Datatype override for the context, if any."),
        dt("context_dimensions", "ParameterContext", "str", "Dimension override for the context, if any."),
        dt("computed", "ParameterContext", "bool", "True if values in this context are computed, not set."),
    ];
    // inverse properties, served by the store's reverse index
    props.extend(vec![
        inv("components", "Product", "Acu", "assembly", "Usages in which this product is the assembly."),
        inv("where_used", "Product", "Acu", "component", "Usages in which this product is the component."),
        inv("systems", "Project", "ProjectSystemUsage", "project", "System usages of this project."),
        inv("projects_using_system", "Product", "ProjectSystemUsage", "system", "Project usages of this product as a system."),
        inv("ports", "Product", "Port", "of_product", "Ports of this product."),
        inv("internal_flows", "Product", "Flow", "flow_context", "Flows internal to this assembly."),
        inv("roles", "Person", "RoleAssignment", "assigned_to", "Role assignments of this person."),
        inv("organizational_role_assignments", "Organization", "RoleAssignment", "role_assignment_context", "Role assignments in this organization."),
        inv("correlates_parameters", "Relation", "ParameterRelation", "referenced_relation", "Parameter relations of this relation."),
        inv("owned_objects", "Organization", "ManagedObject", "owner", "Objects owned by this organization."),
        inv("created_objects", "Person", "Identifiable", "creator", "Objects created by this person."),
        inv("has_models", "Modelable", "Model", "of_thing", "Models of this thing."),
        inv("has_representations", "Model", "Representation", "of_model", "Representations of this model."),
        inv("has_files", "Representation", "RepresentationFile", "of_object", "Files of this representation."),
        inv("allocated_requirements", "Identifiable", "Requirement", "allocated_to", "Requirements allocated to this thing."),
        inv("sub_organizations", "Organization", "Organization", "parent_organization", "Organizations contained in this one."),
        inv("products_of_type", "ProductType", "Product", "product_type", "Products classified by this type."),
        inv("activities", "Product", "Activity", "of_system", "Activities pertaining to this system."),
    ]);
    props
}
