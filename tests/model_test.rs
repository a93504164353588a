use anyhow::Result;
use wsdl_resolver::{
    BindingFilter, BindingStyle, DocumentSet, FetchConfig, SoapUse, WsdlError, WsdlResolver,
};

const BASE: &str = "http://store.example/wsdl/store.wsdl";

const STORE: &str = r##"<?xml version="1.0"?>
<wsdl:definitions xmlns:wsdl="http://schemas.xmlsoap.org/wsdl/"
                  xmlns:soap12="http://schemas.xmlsoap.org/wsdl/soap12/"
                  xmlns:wsp="http://www.w3.org/ns/ws-policy"
                  xmlns:wsu="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd"
                  xmlns:sp="http://docs.oasis-open.org/ws-sx/ws-securitypolicy/200702"
                  xmlns:tns="urn:store" targetNamespace="urn:store">
  <wsp:Policy wsu:Id="Transport"><sp:TransportBinding/></wsp:Policy>
  <wsp:Policy wsu:Id="Signed"><sp:SignedParts/></wsp:Policy>
  <wsdl:binding name="StoreBinding" type="tns:StorePort">
    <wsp:PolicyReference URI="#Transport"/>
    <soap12:binding style="rpc" transport="http://schemas.xmlsoap.org/soap/http"/>
    <wsdl:operation name="Buy">
      <wsp:PolicyReference URI="#Signed"/>
      <soap12:operation soapAction="urn:buy"/>
      <wsdl:input><soap12:body use="encoded" namespace="urn:store:buy"/></wsdl:input>
      <wsdl:output><soap12:body use="encoded"/></wsdl:output>
    </wsdl:operation>
    <wsdl:operation name="Browse">
      <soap12:operation style="document"/>
      <wsdl:input>
        <wsp:Policy><sp:EncryptedParts wsp:Optional="true"/></wsp:Policy>
        <soap12:body use="encoded"/>
      </wsdl:input>
    </wsdl:operation>
  </wsdl:binding>
  <wsdl:service name="Store">
    <wsdl:port name="StoreSoap12" binding="tns:StoreBinding">
      <soap12:address location="https://store.example/soap12"/>
    </wsdl:port>
  </wsdl:service>
</wsdl:definitions>"##;

async fn store() -> Result<wsdl_resolver::Resolution> {
    let mut set = DocumentSet::new(BASE);
    set.documents.insert(BASE.to_string(), STORE.to_string());
    Ok(WsdlResolver::default().replay(&set).await?)
}

fn assertion_names(policy: &wsdl_resolver::Policy) -> Vec<Vec<String>> {
    policy
        .alternatives
        .iter()
        .map(|alt| alt.iter().map(|a| a.name.local.clone()).collect())
        .collect()
}

#[tokio::test]
async fn test_binding_and_operation_policies_merge() -> Result<()> {
    let resolution = store().await?;
    let wsdl = &resolution.wsdl;
    let binding = wsdl.binding_by_name("StoreBinding").expect("binding");

    let buy = &binding.operations[0];
    let input = wsdl.effective_input_policy(binding, buy)?.expect("policy");
    assert_eq!(
        assertion_names(&input),
        vec![vec!["TransportBinding", "SignedParts"]]
    );

    let browse = &binding.operations[1];
    let input = wsdl.effective_input_policy(binding, browse)?.expect("policy");
    assert_eq!(
        assertion_names(&input),
        vec![
            vec!["TransportBinding", "EncryptedParts"],
            vec!["TransportBinding"]
        ]
    );
    let output = wsdl.effective_output_policy(binding, browse)?.expect("policy");
    assert_eq!(assertion_names(&output), vec![vec!["TransportBinding"]]);
    Ok(())
}

#[tokio::test]
async fn test_soap12_only_service() -> Result<()> {
    let resolution = store().await?;
    let wsdl = &resolution.wsdl;

    let port = wsdl.require_soap_port()?;
    assert_eq!(port.name, "StoreSoap12");
    assert_eq!(wsdl.service_uri(), Some("https://store.example/soap12"));
    assert_eq!(wsdl.bindings(BindingFilter::Soap).len(), 1);

    let ops = wsdl.binding_operations(BindingFilter::Soap);
    assert_eq!(wsdl.binding_style(ops[0]), BindingStyle::Rpc);
    assert_eq!(wsdl.binding_style(ops[1]), BindingStyle::Document);
    assert_eq!(wsdl.soap_use(ops[0])?, SoapUse::Encoded);
    assert_eq!(wsdl.binding_input_namespace(ops[0]), "urn:store:buy");
    assert_eq!(wsdl.binding_output_namespace(ops[0]), "urn:store");

    let binding = wsdl.binding_by_name("StoreBinding").expect("binding");
    assert_eq!(wsdl.soap_use_of_binding(binding)?, SoapUse::Encoded);
    Ok(())
}

#[tokio::test]
async fn test_doctype_rejected_unless_stripped() -> Result<()> {
    let text = r#"<!DOCTYPE definitions [<!ENTITY ns "urn:dtd">]>
<definitions xmlns="http://schemas.xmlsoap.org/wsdl/" targetNamespace="&ns;"/>"#;
    let mut set = DocumentSet::new(BASE);
    set.documents.insert(BASE.to_string(), text.to_string());

    let stripped = WsdlResolver::default().replay(&set).await?;
    assert_eq!(stripped.wsdl.target_namespace(), "urn:dtd");
    assert!(!stripped.snapshot().base_document().unwrap_or("").contains("DOCTYPE"));

    let strict = WsdlResolver::new(FetchConfig::default().with_doctype_stripping(false));
    assert!(matches!(
        strict.replay(&set).await,
        Err(WsdlError::FormatError { .. })
    ));
    Ok(())
}
