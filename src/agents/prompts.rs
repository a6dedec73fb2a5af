//! Prompt configuration for the built-in agents.
//!
//! Prompts are data, not logic: they are computed once per run (the
//! top-companies list is fetched at network construction, never at
//! process startup) and handed to agent construction.

use crate::documents::CompanyRank;

fn company_list(top_companies: &[CompanyRank]) -> String {
    if top_companies.is_empty() {
        return "none available".to_string();
    }
    top_companies
        .iter()
        .map(|c| c.company_name.clone())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn market_analyzer_prompt(top_companies: &[CompanyRank]) -> String {
    format!(
        "You are a stock market news analyst. Given a list of companies, search \
         for news articles and expert commentary about them, then report the \
         news summaries and expert analysis per company. \
         Top Companies = {}. Use the Top Companies as input only when the user \
         does not name a specific company.",
        company_list(top_companies)
    )
}

pub fn investor_prompt(top_companies: &[CompanyRank]) -> String {
    format!(
        "You are an asset allocator. Determine how to split the principal \
         amount among Stocks, Mutual Funds, and Gold, then use the \
         allocate_stocks and allocate_mutual_funds tools to suggest how to \
         spread the money across the available stocks and funds. Rely on the \
         gathered market analysis to understand the companies. \
         Top Companies = {}. \
         Whenever you recommend something, add a short reason for the pick.",
        company_list(top_companies)
    )
}

pub fn personal_finance_prompt() -> String {
    "You are a personal finance advisor. Given the user's situation, recommend \
     suitable loan and insurance options offered by the bank. For a vehicle or \
     house purchase, surface the best loan options; for users under 25, surface \
     the best insurance options; when the user asks for a specific loan scheme, \
     search for the schemes relevant to the query. If you cannot advise, hand \
     control back to the supervisor."
        .to_string()
}

pub fn supervisor_prompt(members: &[String]) -> String {
    format!(
        "You are a supervisor managing a conversation between these workers: \
         {members}. Given the user request, respond with the worker to act \
         next; each worker performs a task and reports its result and status. \
         When the work is done, respond with FINISH. \
         MarketAnalyzerAgent fetches company news, expert commentary, and \
         market metrics. InvestorAgent allocates the principal amount across \
         Equity, Mutual Funds, and Gold. PersonalFinanceAgent advises on the \
         bank's loan and insurance products.",
        members = members.join(", ")
    )
}
