mod common;

use std::sync::Arc;

use common::fakes::{
    keyword_needle, InMemoryDocuments, InMemorySearch, ScriptedCompletion, ACQUISITION_NEEDLE, SUBSIDIARY_NEEDLE,
};
use common::fixtures::load_fixture;
use corpref::{
    AppConfig, Collaborators, CompanyTarget, EntitySource, MatchTier, RelationshipEntity, ResolutionOrchestrator,
};

const WIKI: &str = "https://en.wikipedia.org/wiki/";

fn article(title: &str) -> String {
    format!("{}{}", WIKI, title)
}

fn acme_documents() -> InMemoryDocuments {
    InMemoryDocuments::new()
        .with_page(&article("Acme_Markets"), load_fixture("acme_markets.html"))
        .with_page(&article("Acme_Corporation"), load_fixture("acme_corporation.html"))
        .with_page(&article("Acme_Labs"), load_fixture("acme_labs.html"))
        .with_page(&article("Roadrunner_Inc."), load_fixture("roadrunner_inc.html"))
        .with_page(&article("Gamma_Tools"), load_fixture("gamma_tools.html"))
}

fn acme_search() -> InMemorySearch {
    InMemorySearch::new()
        .with_results("Acme", &["Acme Markets", "Acme Corporation"])
        .with_results("Gamma Tools", &["Acme Corporation", "Gamma Tools"])
}

fn acme_completion(website: &str) -> ScriptedCompletion {
    ScriptedCompletion::new()
        .answer(&keyword_needle(website), "Acme, Acme Corporation")
        .answer(&keyword_needle("Gamma Tools"), "Gamma Tools")
        .answer(SUBSIDIARY_NEEDLE, "Acme Labs, Shadow Holdings")
        .answer(ACQUISITION_NEEDLE, "Roadrunner Inc., Gamma Tools")
}

fn orchestrator(
    documents: Arc<InMemoryDocuments>,
    search: Arc<InMemorySearch>,
    completion: Arc<ScriptedCompletion>,
) -> ResolutionOrchestrator {
    let collaborators = Collaborators {
        documents,
        search,
        completion,
    };
    ResolutionOrchestrator::from_config(&AppConfig::default(), collaborators).unwrap()
}

fn find<'a>(entities: &'a [RelationshipEntity], name: &str) -> &'a RelationshipEntity {
    entities
        .iter()
        .find(|e| e.name == name)
        .unwrap_or_else(|| panic!("no entity named {}", name))
}

#[tokio::test]
async fn test_resolves_company_and_related_domains() {
    let documents = Arc::new(acme_documents());
    let website = "https://www.acme.com";
    let orchestrator = orchestrator(documents.clone(), Arc::new(acme_search()), Arc::new(acme_completion(website)));

    let (result, stats) = orchestrator
        .resolve_with_stats(&CompanyTarget::new(website))
        .await
        .unwrap();
    let result = result.expect("Acme Corporation should match");

    assert_eq!(result.main_domain.as_str(), "acme.com");
    assert_eq!(result.reference_url, article("Acme_Corporation"));
    assert_eq!(result.reference_title, "Acme Corporation");
    assert_eq!(result.match_tier, MatchTier::ExactDomain);
    assert_eq!(stats.keywords_tried, 1);
    assert_eq!(stats.candidates_fetched, 2);
    assert_eq!(stats.candidates_rejected, 1);

    let names: Vec<_> = result.subsidiaries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["Acme Labs", "Widget Works", "Shadow Holdings"]);

    let labs = find(&result.subsidiaries, "Acme Labs");
    assert_eq!(labs.source, EntitySource::StructuredField);
    assert_eq!(labs.domain.as_ref().map(|d| d.as_str()), Some("acmelabs.io"));

    let shadow = find(&result.subsidiaries, "Shadow Holdings");
    assert_eq!(shadow.source, EntitySource::TextInference);
    assert!(shadow.candidate_ref_url.is_none());
    assert!(shadow.domain.is_none());

    let names: Vec<_> = result.acquisitions.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["Roadrunner Inc.", "Gamma Tools"]);

    let roadrunner = find(&result.acquisitions, "Roadrunner Inc.");
    assert_eq!(roadrunner.ref_url_via.as_deref(), Some("document_anchor"));
    assert_eq!(roadrunner.domain.as_ref().map(|d| d.as_str()), Some("roadrunner.example"));

    assert_eq!(result.resolved_domain_count(), 2);
    assert!(!documents.was_requested(&article("Gamma_Tools")));
}

#[tokio::test]
async fn test_unlinked_entity_never_gets_a_domain() {
    let documents = Arc::new(acme_documents());
    let website = "acme.com";
    let orchestrator = orchestrator(documents.clone(), Arc::new(acme_search()), Arc::new(acme_completion(website)));

    let result = orchestrator
        .resolve(&CompanyTarget::new(website))
        .await
        .unwrap()
        .unwrap();

    // Search lookup supplies a plausible article, but the parent never links
    // to it under that name.
    let gamma = find(&result.acquisitions, "Gamma Tools");
    assert_eq!(gamma.candidate_ref_url.as_deref(), Some(article("Gamma_Tools").as_str()));
    assert_eq!(gamma.ref_url_via.as_deref(), Some("search_lookup"));
    assert!(gamma.domain.is_none());
    assert!(!documents.was_requested(&article("Gamma_Tools")));
}

#[tokio::test]
async fn test_child_fetch_failure_is_isolated() {
    let documents = Arc::new(acme_documents());
    let website = "acme.com";
    let orchestrator = orchestrator(documents.clone(), Arc::new(acme_search()), Arc::new(acme_completion(website)));

    let result = orchestrator
        .resolve(&CompanyTarget::new(website))
        .await
        .unwrap()
        .unwrap();

    let widget = find(&result.subsidiaries, "Widget Works");
    assert!(documents.was_requested(&article("Widget_Works")));
    assert!(widget.domain.is_none());

    // Siblings still resolve
    assert!(find(&result.subsidiaries, "Acme Labs").domain.is_some());
    assert!(find(&result.acquisitions, "Roadrunner Inc.").domain.is_some());
}

#[tokio::test]
async fn test_no_matching_article_is_not_an_error() {
    let documents = Arc::new(acme_documents());
    let search = Arc::new(InMemorySearch::new().with_results("Globex", &["Acme Markets", "Missing Page"]));
    let completion = Arc::new(ScriptedCompletion::new().answer(&keyword_needle("globex.com"), "Globex, Globex Corporation"));
    let orchestrator = orchestrator(documents.clone(), search.clone(), completion);

    let (result, stats) = orchestrator
        .resolve_with_stats(&CompanyTarget::new("globex.com"))
        .await
        .unwrap();

    assert!(result.is_none());
    assert_eq!(stats.keywords_tried, 2);
    assert_eq!(stats.candidates_fetched, 1);
    // The second keyword's search failed and was skipped
    assert_eq!(search.queries(), vec!["Globex", "Globex Corporation"]);
}

#[tokio::test]
async fn test_titles_are_not_refetched_across_keywords() {
    let documents = Arc::new(acme_documents());
    let search = Arc::new(
        InMemorySearch::new()
            .with_results("Globex", &["Acme Markets"])
            .with_results("Globex Corporation", &["Acme Markets", "Acme_Markets"]),
    );
    let completion = Arc::new(ScriptedCompletion::new().answer(&keyword_needle("globex.com"), "Globex, Globex Corporation"));
    let orchestrator = orchestrator(documents.clone(), search, completion);

    let result = orchestrator.resolve(&CompanyTarget::new("globex.com")).await.unwrap();

    assert!(result.is_none());
    assert_eq!(documents.requested(), vec![article("Acme_Markets")]);
}

#[tokio::test]
async fn test_keyword_service_down_yields_no_result() {
    let documents = Arc::new(acme_documents());
    let search = Arc::new(acme_search());
    let completion = Arc::new(ScriptedCompletion::new());
    let orchestrator = orchestrator(documents.clone(), search.clone(), completion.clone());

    let result = orchestrator.resolve(&CompanyTarget::new("acme.com")).await.unwrap();

    assert!(result.is_none());
    assert_eq!(completion.calls(), 1);
    assert!(search.queries().is_empty());
    assert!(documents.requested().is_empty());
}

#[tokio::test]
async fn test_invalid_website_is_rejected() {
    let orchestrator = orchestrator(
        Arc::new(acme_documents()),
        Arc::new(acme_search()),
        Arc::new(ScriptedCompletion::new()),
    );

    assert!(orchestrator.resolve(&CompanyTarget::new("   ")).await.is_err());
}
