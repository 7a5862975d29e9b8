//! Solidity bindings for the request contracts.
//!
//! `IRequestCore` owns the request registry and the `numRequests` counter, and emits
//! the creation events. `IRequestERC20` is the per-token currency contract through
//! which payees create requests.

use alloy_sol_types::sol;

sol! {
    #[allow(missing_docs)]
    #[derive(Debug)]
    #[sol(rpc)]
    interface IRequestCore {
        function numRequests() external view returns (uint256);

        event Created(
            bytes32 indexed requestId,
            address indexed payee,
            address indexed payer,
            address creator,
            string data
        );

        event NewSubPayee(bytes32 indexed requestId, address indexed payee);
    }
}

sol! {
    #[allow(missing_docs)]
    #[allow(clippy::too_many_arguments)]
    #[derive(Debug)]
    #[sol(rpc)]
    interface IRequestERC20 {
        function createRequestAsPayeeAction(
            address[] _payeesIdAddress,
            address[] _payeesPaymentAddress,
            int256[] _expectedAmounts,
            address _payer,
            address _payerRefundAddress,
            string _data
        ) external payable returns (bytes32 requestId);
    }
}
